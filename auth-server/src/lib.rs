// auth-server/src/lib.rs
//! Session-based authentication service.
//!
//! Users sign up with single-use registration codes minted by whoever holds
//! the registrar key, log in with a password, and hold opaque session tokens
//! that other services check through `/validate-session`.

pub mod api;
pub mod credential_store;
pub mod error;
pub mod middleware;
pub mod password;
pub mod session_manager;
pub mod snapshot;
pub mod state;
pub mod utils;

pub use credential_store::CredentialStore;
pub use error::AuthError;
pub use session_manager::SessionManager;
pub use state::AppState;
