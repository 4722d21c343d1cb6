// common/src/models/registration.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `/invite`
#[derive(Clone, Serialize, Deserialize)]
pub struct InviteRequest {
    pub registrar_key: String,
}

impl fmt::Debug for InviteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InviteRequest")
            .field("registrar_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteResponse {
    pub code: String,
}

/// Body of `/register`
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub registration_code: String,
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("registration_code", &self.registration_code)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
}
