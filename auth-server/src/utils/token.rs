// auth-server/src/utils/token.rs
use rand::{thread_rng, Rng};
use rand::distributions::Alphanumeric;
use sha2::{Sha256, Digest};

/// 24 alphanumeric characters, ~142 bits of entropy
pub const REGISTRATION_CODE_LENGTH: usize = 24;
/// 43 alphanumeric characters, ~256 bits of entropy
pub const SESSION_TOKEN_LENGTH: usize = 43;

/// Generate a cryptographically secure random token of specified length
pub fn generate_secure_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn create_registration_code() -> String {
    generate_secure_token(REGISTRATION_CODE_LENGTH)
}

pub fn create_session_token() -> String {
    generate_secure_token(SESSION_TOKEN_LENGTH)
}

/// SHA-256 of a token, hex encoded. Session tokens are only ever stored in this form.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Compare two secrets without short-circuiting on the first differing byte.
///
/// Inputs are digested first so the running time does not depend on where
/// they differ or on their lengths.
pub fn secrets_match(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
