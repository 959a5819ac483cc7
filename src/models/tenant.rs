//! Tenant model - a registered OAuth client application.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant (OAuth client) registration. Created out-of-band; immutable per
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(rename = "_id")]
    pub id: String,
    /// The OAuth `client_id`. Unique.
    pub name: String,
    pub secret: String,
    /// Pre-registered redirect URI. When absent, caller-supplied URIs are
    /// accepted.
    pub redirect_uri: Option<String>,
    pub allowed_roles: u64,
    /// Space-delimited scope tokens used when the request carries none.
    pub required_scopes: String,
    /// Space-delimited grant types; `None` means unrestricted.
    pub supported_grant_types: Option<String>,
}

impl Tenant {
    pub fn new(name: String, secret: String, redirect_uri: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            secret,
            redirect_uri,
            allowed_roles: 0,
            required_scopes: String::new(),
            supported_grant_types: None,
        }
    }

    /// Whether the tenant may use the given grant type. Unconfigured means
    /// unrestricted.
    pub fn supports_grant_type(&self, grant_type: &str) -> bool {
        match &self.supported_grant_types {
            Some(types) => types.split_whitespace().any(|t| t == grant_type),
            None => true,
        }
    }
}
