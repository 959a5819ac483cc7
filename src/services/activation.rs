//! Registration and account activation.
//!
//! Registration creates a pending identity guarded by a 6-digit code that is
//! emailed to the user and expires after ten minutes. The email dispatch is
//! fire-and-forget: a delivery failure is logged and the registration still
//! succeeds, because the code can be re-requested out-of-band.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{Identity, NewIdentity};
use crate::services::database::IdentityStore;
use crate::services::email::EmailSender;
use crate::utils::hash_password;

/// Activation code validity window.
pub const ACTIVATION_TTL_MINUTES: i64 = 10;

#[derive(Clone)]
pub struct ActivationService {
    identities: Arc<dyn IdentityStore>,
    email: Arc<dyn EmailSender>,
}

impl ActivationService {
    pub fn new(identities: Arc<dyn IdentityStore>, email: Arc<dyn EmailSender>) -> Self {
        Self { identities, email }
    }

    /// Register a new identity, pending activation.
    pub async fn register(&self, input: NewIdentity) -> Result<Identity, AppError> {
        if self
            .identities
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateUsername);
        }

        let code = generate_activation_code();
        let expires_at = Utc::now() + Duration::minutes(ACTIVATION_TTL_MINUTES);
        let password_hash = hash_password(&input.password)?;
        let identity = Identity::new_pending(&input, password_hash, code.clone(), expires_at);

        self.identities.save_identity(&identity).await?;
        tracing::info!(username = %identity.username, "identity registered, pending activation");

        let email = self.email.clone();
        let to = identity.email.clone();
        tokio::spawn(async move {
            if let Err(e) = email.send_activation_email(&to, &code).await {
                tracing::error!(error = %e, "activation email dispatch failed");
            }
        });

        Ok(identity)
    }

    /// Activate an account with the emailed code. Activating an already
    /// active account is a no-op success.
    pub async fn activate(&self, username: &str, code: &str) -> Result<(), AppError> {
        self.activate_at(username, code, Utc::now()).await
    }

    pub(crate) async fn activate_at(
        &self,
        username: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut identity = self
            .identities
            .find_by_username(username)
            .await?
            .ok_or(AppError::InvalidCode)?;

        if identity.activated {
            return Ok(());
        }

        if identity.activation_code.as_deref() != Some(code) {
            return Err(AppError::InvalidCode);
        }
        match identity.activation_expires_at {
            Some(expires_at) if now <= expires_at => {}
            _ => return Err(AppError::ExpiredCode),
        }

        identity.mark_activated();
        self.identities.save_identity(&identity).await?;
        tracing::info!(username = %username, "identity activated");
        Ok(())
    }
}

/// Uniformly random 6-digit code.
fn generate_activation_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}
