// common/src/models/user.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Public view of a user returned by `/user`.
///
/// Omits the password hash and the session tokens themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub emails: Vec<String>,
    pub orgs: BTreeSet<String>,
    /// Number of sessions currently logged in
    pub active_sessions: usize,
    pub created_at: DateTime<Utc>,
}

