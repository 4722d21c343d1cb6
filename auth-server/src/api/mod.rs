// auth-server/src/api/mod.rs
pub mod auth;

use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest};
use crate::error::AuthError;

// Request bodies are a handful of short strings
const MAX_BODY_BYTES: usize = 16 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(MAX_BODY_BYTES)
            .error_handler(malformed_body),
    )
    .service(auth::invite)
    .service(auth::register)
    .service(auth::login)
    .service(auth::logout)
    .service(auth::get_user)
    .service(auth::validate_session);
}

fn malformed_body(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::debug!("Malformed body on {}: {}", req.path(), err);
    AuthError::BadRequest(err.to_string()).into()
}
