// common/src/auth_client.rs
use crate::models::registration::{InviteRequest, InviteResponse, RegisterRequest, RegisterResponse};
use crate::models::session::{LoginRequest, Session};
use crate::models::user::UserProfile;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthClientError {
    #[error("auth server unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unauthorized")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
}

/// Client for services that use the auth server as their shared auth backend
#[derive(Debug, Clone)]
pub struct AuthClient {
    auth_server_addr: String,
    http: reqwest::Client,
}

impl AuthClient {
    /// `auth_server_addr` is a base URL such as `http://127.0.0.1:8082`
    pub fn new(auth_server_addr: impl Into<String>) -> Self {
        Self::with_client(auth_server_addr, reqwest::Client::new())
    }

    pub fn with_client(auth_server_addr: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            auth_server_addr: auth_server_addr.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub async fn create_invite_code(&self, registrar_key: &str) -> Result<String, AuthClientError> {
        let req = InviteRequest {
            registrar_key: registrar_key.to_string(),
        };
        let resp: InviteResponse = self.post_json("/invite", &req).await?;
        Ok(resp.code)
    }

    /// Returns the new user's ID
    pub async fn register(&self, registration_code: &str, password: &str) -> Result<String, AuthClientError> {
        let req = RegisterRequest {
            registration_code: registration_code.to_string(),
            password: password.to_string(),
        };
        let resp: RegisterResponse = self.post_json("/register", &req).await?;
        Ok(resp.user_id)
    }

    pub async fn login(&self, user_id: &str, password: &str) -> Result<Session, AuthClientError> {
        let req = LoginRequest {
            user_id: user_id.to_string(),
            password: password.to_string(),
        };
        self.post_json("/login", &req).await
    }

    /// `Ok(())` only when the server answers 200 for this session
    pub async fn validate_session(&self, session: &Session) -> Result<(), AuthClientError> {
        self.post("/validate-session", session).await.map(|_| ())
    }

    pub async fn logout(&self, session: &Session) -> Result<(), AuthClientError> {
        self.post("/logout", session).await.map(|_| ())
    }

    pub async fn user(&self, session: &Session) -> Result<UserProfile, AuthClientError> {
        self.post_json("/user", session).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AuthClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.post(path, body).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn post<B>(&self, path: &str, body: &B) -> Result<Response, AuthClientError>
    where
        B: Serialize + ?Sized,
    {
        let resp = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await?;

        match resp.status() {
            status if status.is_success() => Ok(resp),
            StatusCode::UNAUTHORIZED => Err(AuthClientError::Unauthorized),
            StatusCode::BAD_REQUEST => {
                let message = resp.text().await.unwrap_or_default();
                Err(AuthClientError::BadRequest(message))
            },
            status => {
                tracing::warn!("Auth server returned {} for {}", status, path);
                Err(AuthClientError::UnexpectedStatus(status.as_u16()))
            }
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.auth_server_addr, path)
    }
}
