//! Grant persistence for the consent step.
//!
//! A grant records that a user approved a set of scopes for a client. Once a
//! grant exists, subsequent logins against the same client skip the consent
//! page entirely. A repeated approval overwrites the previous grant, so the
//! stored scopes always reflect the most recent decision.

use std::sync::Arc;

use crate::error::AppError;
use crate::models::Grant;
use crate::services::database::GrantStore;

#[derive(Clone)]
pub struct ConsentManager {
    grants: Arc<dyn GrantStore>,
}

impl ConsentManager {
    pub fn new(grants: Arc<dyn GrantStore>) -> Self {
        Self { grants }
    }

    pub async fn find_grant(
        &self,
        tenant_id: &str,
        identity_id: &str,
    ) -> Result<Option<Grant>, AppError> {
        self.grants.find_grant(tenant_id, identity_id).await
    }

    pub async fn record_grant(
        &self,
        tenant_id: &str,
        identity_id: &str,
        approved_scopes: &str,
    ) -> Result<Grant, AppError> {
        let grant = Grant::new(tenant_id, identity_id, approved_scopes.to_string());
        self.grants.save_grant(&grant).await?;
        tracing::info!(tenant_id = %tenant_id, identity_id = %identity_id, "consent grant recorded");
        Ok(grant)
    }
}
