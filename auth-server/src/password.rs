// auth-server/src/password.rs
use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::password_hash::{PasswordHasher as _, PasswordVerifier as _};
use argon2::{Algorithm, Argon2, Params, Version};
use common::PasswordHashConfig;
use crate::error::AuthError;

/// Salted Argon2id hashing with a configurable work factor.
///
/// Hashes are PHC strings, so each one carries its own salt and parameters
/// and stays verifiable after the work factor is raised.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new(config: &PasswordHashConfig) -> Result<Self, AuthError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| AuthError::Internal(format!("invalid argon2 parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    /// `Ok(false)` on a wrong password; `Err` only if the stored hash is unusable
    pub fn verify(&self, password: &str, password_hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::Internal(format!("stored password hash is corrupt: {}", e)))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Internal(e.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) fn cheap_hasher() -> PasswordHasher {
    PasswordHasher::new(&PasswordHashConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hasher = cheap_hasher();
        let hash = hasher.hash("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("hunter2"));
        assert!(hasher.verify("hunter2", &hash).unwrap());
    }

    #[test]
    fn test_different_password_fails() {
        let hasher = cheap_hasher();
        let hash = hasher.hash("hunter2").unwrap();
        for wrong in ["hunter3", "Hunter2", "", "hunter2 "] {
            assert!(!hasher.verify(wrong, &hash).unwrap(), "{:?} verified", wrong);
        }
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = cheap_hasher();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_verify_uses_params_from_hash() {
        let old = cheap_hasher();
        let hash = old.hash("hunter2").unwrap();

        let stronger = PasswordHasher::new(&PasswordHashConfig {
            memory_kib: 16,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        assert!(stronger.verify("hunter2", &hash).unwrap());
    }

    #[test]
    fn test_corrupt_hash_is_internal_error() {
        let hasher = cheap_hasher();
        assert!(matches!(
            hasher.verify("hunter2", "not-a-phc-string"),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = PasswordHasher::new(&PasswordHashConfig {
            memory_kib: 1,
            iterations: 1,
            parallelism: 1,
        });
        assert!(result.is_err());
    }
}
