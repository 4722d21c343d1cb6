// auth-server/src/error.rs
use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Every failure the auth service can report
#[derive(Error, Debug)]
pub enum AuthError {
    /// Wrong registrar key or a session check failed before a protected action
    #[error("unauthorized")]
    Unauthorized,

    /// Login failed. Does not say whether the user exists.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid session")]
    InvalidSession,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid registration code")]
    InvalidRegistrationCode,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized
            | AuthError::InvalidCredentials
            | AuthError::InvalidSession => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidRegistrationCode | AuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AuthError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "Internal server error".to_string()
            },
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": message
        }))
    }
}

impl From<BlockingError> for AuthError {
    fn from(e: BlockingError) -> Self {
        AuthError::Internal(format!("blocking task failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidSession.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::UserNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::InvalidRegistrationCode.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_internal_error_hides_detail() {
        let resp = AuthError::Internal("disk /var/lib/auth is full".into()).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Internal server error");
    }

    #[actix_web::test]
    async fn test_error_body_names_failure() {
        let resp = AuthError::InvalidRegistrationCode.error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "invalid registration code");
    }
}
