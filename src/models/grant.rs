//! Grant model - a persisted record of a user's scope approval for a tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// At most one grant exists per (tenant, identity) pair; re-consent
/// overwrites the previous record rather than appending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    /// Composite id `"{tenant_id}:{identity_id}"`.
    #[serde(rename = "_id")]
    pub id: String,
    pub tenant_id: String,
    pub identity_id: String,
    /// Space-delimited approved scope tokens.
    pub approved_scopes: String,
    pub issued_at: DateTime<Utc>,
}

impl Grant {
    pub fn new(tenant_id: &str, identity_id: &str, approved_scopes: String) -> Self {
        Self {
            id: Self::composite_id(tenant_id, identity_id),
            tenant_id: tenant_id.to_string(),
            identity_id: identity_id.to_string(),
            approved_scopes,
            issued_at: Utc::now(),
        }
    }

    pub fn composite_id(tenant_id: &str, identity_id: &str) -> String {
        format!("{tenant_id}:{identity_id}")
    }
}
