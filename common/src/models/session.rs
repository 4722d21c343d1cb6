// common/src/models/session.rs
use actix_web::http::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header carrying the caller's user ID when a service forwards a session
pub const USER_ID_HEADER: &str = "X-User-ID";
/// Header carrying the caller's session token
pub const TOKEN_HEADER: &str = "X-Token";

/// A session token bound to the user it was issued for
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub token: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }

    /// Read a forwarded session from `X-User-ID` / `X-Token`
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let user_id = headers.get(USER_ID_HEADER)?.to_str().ok()?;
        let token = headers.get(TOKEN_HEADER)?.to_str().ok()?;
        if user_id.is_empty() || token.is_empty() {
            return None;
        }
        Some(Self::new(user_id, token))
    }
}

// Tokens are credentials; keep them out of logs
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Body of `/login`
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("user_id", &self.user_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        map
    }

    #[test]
    fn test_session_from_headers() {
        let map = headers(&[("x-user-id", "u1"), ("x-token", "t1")]);
        assert_eq!(Session::from_headers(&map), Some(Session::new("u1", "t1")));
    }

    #[test]
    fn test_session_from_headers_requires_both() {
        assert_eq!(Session::from_headers(&headers(&[("x-user-id", "u1")])), None);
        assert_eq!(Session::from_headers(&headers(&[("x-token", "t1")])), None);
        assert_eq!(
            Session::from_headers(&headers(&[("x-user-id", ""), ("x-token", "t1")])),
            None
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let session = Session::new("u1", "super-secret-token");
        assert!(!format!("{:?}", session).contains("super-secret-token"));

        let login = LoginRequest {
            user_id: "u1".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", login).contains("hunter2"));
    }
}
