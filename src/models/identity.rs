//! Identity model - a user account with activation state and role bitmask.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default role mask for self-registered identities (bit 0).
pub const DEFAULT_ROLES: u64 = 1;

/// Default provided scopes for self-registered identities.
pub const DEFAULT_PROVIDED_SCOPES: &str = "resource.read resource.write";

/// Identity document. Usernames are unique and case-sensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub roles: u64,
    pub provided_scopes: String,
    pub activated: bool,
    pub activation_code: Option<String>,
    pub activation_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating an identity (password still in clear; hashed by the
/// activation service).
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub password: String,
    pub email: String,
    pub phone: String,
    pub birth_date: NaiveDate,
}

impl Identity {
    /// Create a pending (not yet activated) identity.
    pub fn new_pending(
        input: &NewIdentity,
        password_hash: String,
        activation_code: String,
        activation_expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: input.username.clone(),
            password_hash,
            email: input.email.clone(),
            phone: input.phone.clone(),
            birth_date: input.birth_date,
            roles: DEFAULT_ROLES,
            provided_scopes: DEFAULT_PROVIDED_SCOPES.to_string(),
            activated: false,
            activation_code: Some(activation_code),
            activation_expires_at: Some(activation_expires_at),
            created_at: Utc::now(),
        }
    }

    /// Clear the activation fields and mark the account active.
    pub fn mark_activated(&mut self) {
        self.activated = true;
        self.activation_code = None;
        self.activation_expires_at = None;
    }
}
