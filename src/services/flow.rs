//! The authorization-code flow state machine.
//!
//! Carries a request from `/authorize` through login and consent to the final
//! redirect. The flow is stateless on the server: everything in between lives
//! in the signed session cookie. Errors raised before the redirect URI is
//! trusted surface as `AppError`; once it has been validated they travel back
//! to the client as `error`/`error_description` query parameters instead.

use chrono::Utc;
use std::sync::Arc;

use crate::error::AppError;
use crate::oauth::code::AuthorizationCodeCodec;
use crate::oauth::request::{self, AuthorizationRequest, AuthorizeQuery};
use crate::oauth::session::SessionStateCodec;
use crate::roles::RoleRegistry;
use crate::services::consent::ConsentManager;
use crate::services::database::{IdentityStore, TenantStore};
use crate::utils::verify_password;

/// Where a successful login sends the user next.
#[derive(Debug)]
pub enum LoginOutcome {
    /// A grant already exists: redirect straight back with a fresh code.
    Authorized { location: String },
    /// First login against this client: render the consent page and carry
    /// the username forward in a re-encoded session.
    ConsentRequired {
        request: AuthorizationRequest,
        session: String,
    },
}

#[derive(Clone)]
pub struct AuthorizationFlow {
    identities: Arc<dyn IdentityStore>,
    tenants: Arc<dyn TenantStore>,
    consent: ConsentManager,
    sessions: SessionStateCodec,
    codes: AuthorizationCodeCodec,
    roles: Arc<RoleRegistry>,
}

impl AuthorizationFlow {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        tenants: Arc<dyn TenantStore>,
        consent: ConsentManager,
        sessions: SessionStateCodec,
        codes: AuthorizationCodeCodec,
        roles: Arc<RoleRegistry>,
    ) -> Self {
        Self {
            identities,
            tenants,
            consent,
            sessions,
            codes,
            roles,
        }
    }

    pub fn sessions(&self) -> &SessionStateCodec {
        &self.sessions
    }

    /// Entry point: validate the raw query and mint the session state that
    /// the login page will carry.
    pub async fn authorize(
        &self,
        query: AuthorizeQuery,
    ) -> Result<(AuthorizationRequest, String), AppError> {
        let (_, request) = request::validate(query, self.tenants.as_ref()).await?;
        let session = self.sessions.encode(&request);
        Ok((request, session))
    }

    /// Authenticate the user and decide between an immediate redirect (a
    /// grant already covers this client) and the consent page.
    pub async fn login(
        &self,
        session: &str,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, AppError> {
        let mut request = self.sessions.decode(session);
        if request.client_id.is_empty() {
            return Err(AppError::SessionCorrupted);
        }

        // Unknown user, wrong password and unactivated account all collapse
        // into the same credential failure.
        let identity = self
            .identities
            .find_by_username(username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        if !verify_password(&identity.password_hash, password)? {
            return Err(AppError::InvalidCredentials);
        }
        if !identity.activated {
            tracing::debug!(username = %username, "login attempt on unactivated account");
            return Err(AppError::InvalidCredentials);
        }
        tracing::info!(
            username = %identity.username,
            roles = ?self.roles.roles_from_bitmask(identity.roles),
            "login accepted"
        );

        match self
            .consent
            .find_grant(&request.client_id, &identity.username)
            .await?
        {
            Some(grant) => {
                let code = self.codes.issue(
                    &request.client_id,
                    &identity.username,
                    &grant.approved_scopes,
                    &request.redirect_uri,
                    &request.code_challenge,
                    Utc::now(),
                );
                tracing::info!(
                    client_id = %request.client_id,
                    username = %identity.username,
                    "existing grant, consent skipped"
                );
                Ok(LoginOutcome::Authorized {
                    location: success_redirect(&request.redirect_uri, &code, request.state.as_deref()),
                })
            }
            None => {
                request.username = Some(identity.username.clone());
                let session = self.sessions.encode(&request);
                Ok(LoginOutcome::ConsentRequired { request, session })
            }
        }
    }

    /// Record the consent decision and finish the flow with a redirect.
    /// Both denial and approval end in a 303; only a corrupted session is
    /// reported as an error.
    pub async fn consent(
        &self,
        session: &str,
        approved_scope: &str,
        approval_status: &str,
    ) -> Result<String, AppError> {
        let request = self.sessions.decode(session);
        if request.client_id.is_empty() {
            return Err(AppError::SessionCorrupted);
        }
        let username = request
            .username
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(AppError::SessionCorrupted)?;

        let approved_scope = approved_scope.trim();
        if approval_status == "NO" || approved_scope.is_empty() {
            tracing::info!(client_id = %request.client_id, username = %username, "consent denied");
            return Ok(error_redirect(
                &request.redirect_uri,
                "access_denied",
                "the resource owner denied the request",
                request.state.as_deref(),
            ));
        }

        if request.code_challenge.trim().is_empty() {
            return Ok(error_redirect(
                &request.redirect_uri,
                "invalid_request",
                "code_challenge is missing",
                request.state.as_deref(),
            ));
        }

        self.consent
            .record_grant(&request.client_id, username, approved_scope)
            .await?;

        let code = self.codes.issue(
            &request.client_id,
            username,
            approved_scope,
            &request.redirect_uri,
            &request.code_challenge,
            Utc::now(),
        );
        Ok(success_redirect(&request.redirect_uri, &code, request.state.as_deref()))
    }
}

/// `{redirect_uri}?code=...[&state=...]`, both values url-encoded.
fn success_redirect(redirect_uri: &str, code: &str, state: Option<&str>) -> String {
    let mut location = format!("{redirect_uri}?code={}", urlencoding::encode(code));
    if let Some(state) = state {
        location.push_str("&state=");
        location.push_str(&urlencoding::encode(state));
    }
    location
}

fn error_redirect(
    redirect_uri: &str,
    error: &str,
    description: &str,
    state: Option<&str>,
) -> String {
    let mut location = format!(
        "{redirect_uri}?error={}&error_description={}",
        urlencoding::encode(error),
        urlencoding::encode(description)
    );
    if let Some(state) = state {
        location.push_str("&state=");
        location.push_str(&urlencoding::encode(state));
    }
    location
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identity, NewIdentity, Tenant};
    use crate::services::database::MemoryStore;
    use crate::utils::hash_password;

    const SESSION_KEY: &[u8] = b"session-test-key";
    const CODE_KEY: &[u8] = b"code-test-key";

    async fn seed(store: &MemoryStore) {
        store
            .save_tenant(&Tenant {
                id: "t-1".to_string(),
                name: "acme-portal".to_string(),
                secret: "s3cret".to_string(),
                redirect_uri: Some("https://acme.example/cb".to_string()),
                allowed_roles: 1,
                required_scopes: "resource.read".to_string(),
                supported_grant_types: Some("authorization_code".to_string()),
            })
            .await
            .unwrap();

        let new = NewIdentity {
            username: "alice".to_string(),
            password: "hunter2!".to_string(),
            email: "alice@example.com".to_string(),
            phone: "+21612345678".to_string(),
            birth_date: chrono::NaiveDate::from_ymd_opt(1990, 1, 2).unwrap(),
        };
        let mut identity = Identity::new_pending(
            &new,
            hash_password("hunter2!").unwrap(),
            "123456".to_string(),
            Utc::now(),
        );
        identity.mark_activated();
        store.save_identity(&identity).await.unwrap();
    }

    fn flow(store: Arc<MemoryStore>) -> AuthorizationFlow {
        AuthorizationFlow::new(
            store.clone(),
            store.clone(),
            ConsentManager::new(store),
            SessionStateCodec::new(SESSION_KEY),
            AuthorizationCodeCodec::new(CODE_KEY),
            Arc::new(RoleRegistry::from_names(&["admin", "clinician", "patient"])),
        )
    }

    fn query() -> AuthorizeQuery {
        AuthorizeQuery {
            client_id: Some("acme-portal".to_string()),
            response_type: Some("code".to_string()),
            code_challenge: Some("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".to_string()),
            code_challenge_method: Some("S256".to_string()),
            state: Some("xyz".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn first_login_requires_consent() {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;
        let flow = flow(store);

        let (_, session) = flow.authorize(query()).await.unwrap();
        match flow.login(&session, "alice", "hunter2!").await.unwrap() {
            LoginOutcome::ConsentRequired { request, .. } => {
                assert_eq!(request.username.as_deref(), Some("alice"));
            }
            other => panic!("expected consent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn approval_issues_a_decodable_code() {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;
        let flow = flow(store);

        let (_, session) = flow.authorize(query()).await.unwrap();
        let session = match flow.login(&session, "alice", "hunter2!").await.unwrap() {
            LoginOutcome::ConsentRequired { session, .. } => session,
            other => panic!("expected consent, got {other:?}"),
        };

        let location = flow.consent(&session, "resource.read", "YES").await.unwrap();
        assert!(location.starts_with("https://acme.example/cb?code="));
        assert!(location.ends_with("&state=xyz"));

        let raw = location
            .split("code=")
            .nth(1)
            .unwrap()
            .split('&')
            .next()
            .unwrap();
        let code = urlencoding::decode(raw).unwrap();
        let claims = AuthorizationCodeCodec::new(CODE_KEY)
            .decode(&code, Utc::now())
            .unwrap();
        assert_eq!(claims.client_id, "acme-portal");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.approved_scopes, "resource.read");
        assert_eq!(claims.redirect_uri, "https://acme.example/cb");
    }

    #[tokio::test]
    async fn existing_grant_skips_consent_with_its_scopes() {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;
        let flow = flow(store.clone());

        flow.consent
            .record_grant("acme-portal", "alice", "resource.read resource.write")
            .await
            .unwrap();

        // Ask for narrower scopes; the stored grant still wins.
        let mut q = query();
        q.scope = Some("resource.read".to_string());
        let (_, session) = flow.authorize(q).await.unwrap();
        let location = match flow.login(&session, "alice", "hunter2!").await.unwrap() {
            LoginOutcome::Authorized { location } => location,
            other => panic!("expected redirect, got {other:?}"),
        };

        let raw = location
            .split("code=")
            .nth(1)
            .unwrap()
            .split('&')
            .next()
            .unwrap();
        let code = urlencoding::decode(raw).unwrap();
        let claims = AuthorizationCodeCodec::new(CODE_KEY)
            .decode(&code, Utc::now())
            .unwrap();
        assert_eq!(claims.approved_scopes, "resource.read resource.write");
    }

    #[tokio::test]
    async fn denial_redirects_with_access_denied() {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;
        let flow = flow(store);

        let (_, session) = flow.authorize(query()).await.unwrap();
        let session = match flow.login(&session, "alice", "hunter2!").await.unwrap() {
            LoginOutcome::ConsentRequired { session, .. } => session,
            other => panic!("expected consent, got {other:?}"),
        };

        let location = flow.consent(&session, "resource.read", "NO").await.unwrap();
        assert!(location.starts_with("https://acme.example/cb?error=access_denied"));
        assert!(location.contains("&state=xyz"));
    }

    #[tokio::test]
    async fn blank_approved_scopes_count_as_denial() {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;
        let flow = flow(store);

        let (_, session) = flow.authorize(query()).await.unwrap();
        let session = match flow.login(&session, "alice", "hunter2!").await.unwrap() {
            LoginOutcome::ConsentRequired { session, .. } => session,
            other => panic!("expected consent, got {other:?}"),
        };

        let location = flow.consent(&session, "   ", "YES").await.unwrap();
        assert!(location.contains("error=access_denied"));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_indistinguishable() {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;
        let flow = flow(store);

        let (_, session) = flow.authorize(query()).await.unwrap();
        let a = flow.login(&session, "alice", "wrong").await.unwrap_err();
        let b = flow.login(&session, "nobody", "hunter2!").await.unwrap_err();
        assert!(matches!(a, AppError::InvalidCredentials));
        assert!(matches!(b, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn unactivated_account_cannot_log_in() {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;
        let new = NewIdentity {
            username: "pending".to_string(),
            password: "hunter2!".to_string(),
            email: "pending@example.com".to_string(),
            phone: "+21612345678".to_string(),
            birth_date: chrono::NaiveDate::from_ymd_opt(1990, 1, 2).unwrap(),
        };
        let identity = Identity::new_pending(
            &new,
            hash_password("hunter2!").unwrap(),
            "123456".to_string(),
            Utc::now() + chrono::Duration::minutes(10),
        );
        store.save_identity(&identity).await.unwrap();
        let flow = flow(store);

        let (_, session) = flow.authorize(query()).await.unwrap();
        assert!(matches!(
            flow.login(&session, "pending", "hunter2!").await.unwrap_err(),
            AppError::InvalidCredentials
        ));
    }

    #[tokio::test]
    async fn tampered_session_is_rejected_at_login() {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;
        let flow = flow(store);

        assert!(matches!(
            flow.login("v1.not.real", "alice", "hunter2!").await.unwrap_err(),
            AppError::SessionCorrupted
        ));
    }

    #[tokio::test]
    async fn consent_without_login_is_a_corrupted_session() {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;
        let flow = flow(store);

        // Valid session, but no username was ever attached.
        let (_, session) = flow.authorize(query()).await.unwrap();
        assert!(matches!(
            flow.consent(&session, "resource.read", "YES").await.unwrap_err(),
            AppError::SessionCorrupted
        ));
    }
}
