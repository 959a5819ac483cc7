//! Authorization request validation.
//!
//! Normalizes the raw `/authorize` query parameters against the tenant's
//! registration, failing fast with a distinguishable error per step.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Tenant;
use crate::services::database::TenantStore;

/// Raw query parameters of `GET /authorize`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeQuery {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub scope: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub state: Option<String>,
}

/// A validated, normalized authorization request. Transient: it only ever
/// lives inside the client-carried session state and is discarded once a
/// code is issued or the flow errors out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub response_type: String,
    pub scope: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Filled in once login has succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Validates the query against the tenant registration, in order:
/// client_id -> grant type -> redirect_uri -> response_type -> PKCE ->
/// scope default -> state warning. Returns the tenant alongside the
/// populated request.
pub async fn validate(
    query: AuthorizeQuery,
    tenants: &dyn TenantStore,
) -> Result<(Tenant, AuthorizationRequest), AppError> {
    // 1. Tenant must exist.
    let client_id = non_empty(query.client_id)
        .ok_or_else(|| AppError::InvalidRequest("client_id is missing".to_string()))?;
    let tenant = tenants
        .find_by_name(&client_id)
        .await?
        .ok_or_else(|| AppError::UnknownClient(client_id.clone()))?;

    // 2. Grant type must be allowed for this tenant.
    if !tenant.supports_grant_type("authorization_code") {
        return Err(AppError::InvalidRequest(format!(
            "grant type authorization_code is not allowed for client {client_id}"
        )));
    }

    // 3. Redirect URI: a pre-registered URI wins and any supplied value must
    //    match it exactly; without a registration the caller must supply one.
    let supplied = non_empty(query.redirect_uri);
    let redirect_uri = match &tenant.redirect_uri {
        Some(registered) if !registered.is_empty() => {
            if let Some(supplied) = &supplied {
                if supplied != registered {
                    return Err(AppError::RedirectMismatch);
                }
            }
            registered.clone()
        }
        _ => supplied.ok_or_else(|| {
            AppError::InvalidRequest(
                "redirect_uri is not pre-registered and must be provided".to_string(),
            )
        })?,
    };

    // 4. Only the authorization code response type is supported.
    let response_type = query.response_type.unwrap_or_default();
    if response_type != "code" {
        return Err(AppError::InvalidRequest(format!(
            "response_type must be 'code', got '{response_type}'"
        )));
    }

    // 5. PKCE is mandatory and pinned to S256.
    let code_challenge_method = query.code_challenge_method.unwrap_or_default();
    if code_challenge_method != "S256" {
        return Err(AppError::InvalidRequest(format!(
            "code_challenge_method must be 'S256', got '{code_challenge_method}'"
        )));
    }
    let code_challenge = non_empty(query.code_challenge)
        .ok_or_else(|| AppError::InvalidRequest("code_challenge is missing".to_string()))?;

    // 6. Absent scope falls back to the tenant's required scopes.
    let scope = non_empty(query.scope).unwrap_or_else(|| tenant.required_scopes.clone());

    // 7. state is recommended, not mandatory.
    let state = non_empty(query.state);
    if state.is_none() {
        tracing::warn!(client_id = %client_id, "authorization request without state parameter; CSRF protection weakened");
    }

    let request = AuthorizationRequest {
        client_id,
        redirect_uri,
        response_type,
        scope,
        code_challenge,
        code_challenge_method,
        state,
        username: None,
    };
    Ok((tenant, request))
}
