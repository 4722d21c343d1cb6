// auth-server/src/api/auth.rs
use actix_web::{post, route, web, HttpRequest, HttpResponse};
use common::models::registration::{InviteRequest, InviteResponse, RegisterRequest, RegisterResponse};
use common::models::session::{LoginRequest, Session};
use crate::error::AuthError;
use crate::state::AppState;

// Mint a registration code
#[post("/invite")]
pub async fn invite(
    state: web::Data<AppState>,
    body: web::Json<InviteRequest>,
) -> Result<HttpResponse, AuthError> {
    let code = state.store.invite(&body.registrar_key)?;
    Ok(HttpResponse::Ok().json(InviteResponse { code }))
}

// Consume a registration code and create a user
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AuthError> {
    let RegisterRequest { registration_code, password } = body.into_inner();
    let store = state.store.clone();

    // Hashing is deliberately slow; keep it off the async workers
    let user_id = web::block(move || store.register(&registration_code, &password)).await??;

    Ok(HttpResponse::Ok().json(RegisterResponse { user_id }))
}

// Open a session
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AuthError> {
    let LoginRequest { user_id, password } = body.into_inner();
    let sessions = state.sessions.clone();

    let (user_id, token) = web::block(move || {
        sessions.login(&user_id, &password).map(|token| (user_id, token))
    })
    .await??;

    Ok(HttpResponse::Ok().json(Session { user_id, token }))
}

// Close the session presented in the body
#[post("/logout")]
pub async fn logout(
    state: web::Data<AppState>,
    body: web::Json<Session>,
) -> Result<HttpResponse, AuthError> {
    authorize(&state, &body)?;
    state.sessions.logout(&body.user_id, &body.token);
    Ok(HttpResponse::Ok().finish())
}

// Profile of the session's user
#[route("/user", method = "GET", method = "POST")]
pub async fn get_user(
    state: web::Data<AppState>,
    body: web::Json<Session>,
) -> Result<HttpResponse, AuthError> {
    authorize(&state, &body)?;
    let profile = state.store.get(&body.user_id).ok_or(AuthError::Unauthorized)?;
    Ok(HttpResponse::Ok().json(profile))
}

// Session check for other services. Takes a JSON body or X-User-ID / X-Token headers.
#[post("/validate-session")]
pub async fn validate_session(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Option<web::Json<Session>>,
) -> Result<HttpResponse, AuthError> {
    let session = body
        .map(web::Json::into_inner)
        .or_else(|| Session::from_headers(req.headers()))
        .ok_or_else(|| AuthError::BadRequest("missing session".to_string()))?;

    state.sessions.validate_session(&session.user_id, &session.token)?;
    Ok(HttpResponse::Ok().finish())
}

// Runs before any protected action touches state
fn authorize(state: &AppState, session: &Session) -> Result<(), AuthError> {
    state
        .sessions
        .validate_session(&session.user_id, &session.token)
        .map_err(|_| {
            tracing::warn!("Unauthorized request for user: {}", session.user_id);
            AuthError::Unauthorized
        })
}
