// auth-server/src/session_manager.rs
use std::sync::Arc;
use crate::credential_store::CredentialStore;
use crate::error::AuthError;
use crate::utils::token::create_session_token;

/// Issues, validates and revokes session tokens on top of the credential store
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<CredentialStore>,
}

impl SessionManager {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }

    /// Verify the password and open a new session. Existing sessions stay valid.
    ///
    /// Unknown users and wrong passwords both fail with `InvalidCredentials`.
    pub fn login(&self, user_id: &str, password: &str) -> Result<String, AuthError> {
        match self.store.verify_password(user_id, password) {
            Ok(true) => {},
            Ok(false) => {
                tracing::debug!("Login failed for {}: wrong password", user_id);
                return Err(AuthError::InvalidCredentials);
            },
            Err(AuthError::UserNotFound) => {
                tracing::debug!("Login failed for {}: no such user", user_id);
                return Err(AuthError::InvalidCredentials);
            },
            Err(e) => return Err(e),
        }

        loop {
            let token = create_session_token();
            match self.store.add_session(user_id, &token) {
                Ok(true) => {
                    tracing::info!("Opened session for user: {}", user_id);
                    return Ok(token);
                },
                Ok(false) => continue,
                Err(AuthError::UserNotFound) => return Err(AuthError::InvalidCredentials),
                Err(e) => return Err(e),
            }
        }
    }

    pub fn validate_session(&self, user_id: &str, token: &str) -> Result<(), AuthError> {
        if self.store.has_session(user_id, token) {
            Ok(())
        } else {
            tracing::debug!("Rejected session for user: {}", user_id);
            Err(AuthError::InvalidSession)
        }
    }

    /// Revoke the token. Revoking an inactive token is a no-op.
    pub fn logout(&self, user_id: &str, token: &str) {
        if self.store.remove_session(user_id, token) {
            tracing::info!("Closed session for user: {}", user_id);
        }
    }
}
