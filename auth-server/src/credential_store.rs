// auth-server/src/credential_store.rs
//! Users and outstanding registration codes.
//!
//! Both tables are `DashMap`s, so every read-then-write holds only the shard
//! lock of the key in play. Password hashing and verification run with no
//! lock held.

use chrono::{DateTime, Utc};
use common::models::user::UserProfile;
use common::Config;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;
use crate::error::AuthError;
use crate::password::PasswordHasher;
use crate::utils::token::{create_registration_code, generate_secure_token, hash_token, secrets_match};

/// Stored user. Never leaves the store except inside a snapshot.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserRecord {
    password_hash: String,
    /// SHA-256 digests of the active session tokens
    #[serde(default)]
    session_tokens: HashSet<String>,
    #[serde(default)]
    emails: Vec<String>,
    #[serde(default)]
    orgs: BTreeSet<String>,
    created_at: DateTime<Utc>,
}

impl UserRecord {
    fn new(password_hash: String) -> Self {
        Self {
            password_hash,
            session_tokens: HashSet::new(),
            emails: Vec::new(),
            orgs: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    fn profile(&self, user_id: &str) -> UserProfile {
        UserProfile {
            user_id: user_id.to_string(),
            emails: self.emails.clone(),
            orgs: self.orgs.clone(),
            active_sessions: self.session_tokens.len(),
            created_at: self.created_at,
        }
    }
}

/// Serializable image of the whole store
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub users: HashMap<String, UserRecord>,
    /// Outstanding registration codes and when they were issued
    #[serde(default)]
    pub registration_codes: HashMap<String, DateTime<Utc>>,
}

pub struct CredentialStore {
    users: DashMap<String, UserRecord>,
    registration_codes: DashMap<String, DateTime<Utc>>,
    registrar_key: String,
    hasher: PasswordHasher,
    // Verified against when the user does not exist, so both login failures cost the same
    dummy_hash: String,
    dirty: AtomicBool,
}

impl CredentialStore {
    pub fn new(registrar_key: impl Into<String>, hasher: PasswordHasher) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash(&generate_secure_token(16))?;

        Ok(Self {
            users: DashMap::new(),
            registration_codes: DashMap::new(),
            registrar_key: registrar_key.into(),
            hasher,
            dummy_hash,
            dirty: AtomicBool::new(false),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(&config.password_hash)?;
        Self::new(config.registrar_key.clone(), hasher)
    }

    /// Mint a registration code. Requires the registrar key.
    pub fn invite(&self, registrar_key: &str) -> Result<String, AuthError> {
        if !secrets_match(registrar_key, &self.registrar_key) {
            tracing::warn!("Invite rejected: wrong registrar key");
            return Err(AuthError::Unauthorized);
        }

        let code = loop {
            let candidate = create_registration_code();
            if let Entry::Vacant(slot) = self.registration_codes.entry(candidate.clone()) {
                slot.insert(Utc::now());
                break candidate;
            }
        };

        self.mark_dirty();
        tracing::info!("Issued registration code ({} outstanding)", self.registration_codes.len());
        Ok(code)
    }

    /// Consume `code` and create a user with `password`. Returns the new user ID.
    pub fn register(&self, code: &str, password: &str) -> Result<String, AuthError> {
        if password.is_empty() {
            return Err(AuthError::BadRequest("password must not be empty".to_string()));
        }
        // Cheap pre-check so unknown codes never pay for a hash
        if !self.registration_codes.contains_key(code) {
            tracing::debug!("Registration with unknown code");
            return Err(AuthError::InvalidRegistrationCode);
        }

        let password_hash = self.hasher.hash(password)?;

        // The removal is the single point where the code is consumed
        if self.registration_codes.remove(code).is_none() {
            tracing::debug!("Registration code consumed by a concurrent request");
            return Err(AuthError::InvalidRegistrationCode);
        }

        let user_id = self.insert_new_user(UserRecord::new(password_hash));
        self.mark_dirty();
        tracing::info!("Registered new user: {}", user_id);
        Ok(user_id)
    }

    /// Check `password` against the stored hash of `user_id`
    pub fn verify_password(&self, user_id: &str, password: &str) -> Result<bool, AuthError> {
        // Clone the hash out so the shard lock is released before the slow part
        let stored = self
            .users
            .get(user_id)
            .map(|user| user.password_hash.clone());

        match stored {
            Some(password_hash) => self.hasher.verify(password, &password_hash),
            None => {
                let _ = self.hasher.verify(password, &self.dummy_hash);
                Err(AuthError::UserNotFound)
            }
        }
    }

    pub fn get(&self, user_id: &str) -> Option<UserProfile> {
        self.users.get(user_id).map(|user| user.profile(user_id))
    }

    /// Create `user_id` with `password` unless it already exists. Returns whether it was created.
    pub fn ensure_user(&self, user_id: &str, password: &str) -> Result<bool, AuthError> {
        if self.users.contains_key(user_id) {
            return Ok(false);
        }
        let password_hash = self.hasher.hash(password)?;

        match self.users.entry(user_id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(UserRecord::new(password_hash));
                self.mark_dirty();
                Ok(true)
            }
        }
    }

    /// Record a new session token for `user_id`. Returns false if it was already active.
    pub fn add_session(&self, user_id: &str, token: &str) -> Result<bool, AuthError> {
        let mut user = self.users.get_mut(user_id).ok_or(AuthError::UserNotFound)?;
        let added = user.session_tokens.insert(hash_token(token));
        drop(user);

        if added {
            self.mark_dirty();
        }
        Ok(added)
    }

    /// Returns whether the token was active
    pub fn remove_session(&self, user_id: &str, token: &str) -> bool {
        let removed = self
            .users
            .get_mut(user_id)
            .map(|mut user| user.session_tokens.remove(&hash_token(token)))
            .unwrap_or(false);

        if removed {
            self.mark_dirty();
        }
        removed
    }

    pub fn has_session(&self, user_id: &str, token: &str) -> bool {
        self.users
            .get(user_id)
            .map(|user| user.session_tokens.contains(&hash_token(token)))
            .unwrap_or(false)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn outstanding_codes(&self) -> usize {
        self.registration_codes.len()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            users: self
                .users
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect(),
            registration_codes: self
                .registration_codes
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        }
    }

    /// Load a snapshot into the store. Existing keys are overwritten.
    pub fn restore(&self, snapshot: StoreSnapshot) {
        let users = snapshot.users.len();
        let codes = snapshot.registration_codes.len();
        for (user_id, record) in snapshot.users {
            self.users.insert(user_id, record);
        }
        for (code, issued_at) in snapshot.registration_codes {
            self.registration_codes.insert(code, issued_at);
        }
        tracing::info!("Restored {} users and {} registration codes", users, codes);
    }

    /// Clear the dirty flag, returning whether anything changed since the last call
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    fn insert_new_user(&self, record: UserRecord) -> String {
        loop {
            let user_id = Uuid::new_v4().to_string();
            if let Entry::Vacant(slot) = self.users.entry(user_id.clone()) {
                slot.insert(record);
                break user_id;
            }
        }
    }
}
