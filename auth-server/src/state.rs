// auth-server/src/state.rs
use common::Config;
use std::path::Path;
use std::sync::Arc;
use crate::credential_store::CredentialStore;
use crate::error::AuthError;
use crate::session_manager::SessionManager;
use crate::snapshot::load_snapshot;

/// User ID of the account bootstrapped from `admin_password`
pub const ADMIN_USER_ID: &str = "admin";

/// Shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CredentialStore>,
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        let sessions = SessionManager::new(Arc::clone(&store));
        Self { store, sessions }
    }

    /// Build the store, restore the snapshot and bootstrap the admin account
    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        let store = CredentialStore::from_config(config)?;

        if let Some(path) = &config.storage.snapshot_path {
            if let Some(snapshot) = load_snapshot(Path::new(path))? {
                store.restore(snapshot);
            }
        }

        if let Some(admin_password) = &config.admin_password {
            if store.ensure_user(ADMIN_USER_ID, admin_password)? {
                tracing::info!("Created bootstrap user: {}", ADMIN_USER_ID);
            }
        }

        Ok(Self::new(Arc::new(store)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::write_snapshot;
    use common::PasswordHashConfig;

    fn config() -> Config {
        Config {
            password_hash: PasswordHashConfig {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_admin_bootstrap() {
        let config = Config {
            admin_password: Some("root-pass".to_string()),
            ..config()
        };
        let state = AppState::from_config(&config).unwrap();
        let token = state.sessions.login(ADMIN_USER_ID, "root-pass").unwrap();
        assert!(state.sessions.validate_session(ADMIN_USER_ID, &token).is_ok());
    }

    #[test]
    fn test_no_admin_without_password() {
        let state = AppState::from_config(&config()).unwrap();
        assert!(state.store.get(ADMIN_USER_ID).is_none());
        assert_eq!(state.store.user_count(), 0);
    }

    #[test]
    fn test_restores_snapshot_before_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");

        let first = AppState::from_config(&Config {
            admin_password: Some("original".to_string()),
            ..config()
        })
        .unwrap();
        let code = first.store.invite("dev_registrar_key").unwrap();
        let user_id = first.store.register(&code, "hunter2").unwrap();
        write_snapshot(&path, &first.store.snapshot()).unwrap();

        let mut second_config = config();
        second_config.admin_password = Some("changed".to_string());
        second_config.storage.snapshot_path = Some(path.to_string_lossy().into_owned());
        let second = AppState::from_config(&second_config).unwrap();

        assert!(second.store.verify_password(&user_id, "hunter2").unwrap());
        // Existing admin keeps its password
        assert!(second.store.verify_password(ADMIN_USER_ID, "original").unwrap());
        assert!(!second.store.verify_password(ADMIN_USER_ID, "changed").unwrap());
    }
}
