//! Authorization code issuance.
//!
//! The code is not a database row: it is a self-contained HMAC-signed value
//! carrying everything the downstream token exchange needs, including the
//! PKCE code challenge, so verifier validation requires no lookup. Expiry is
//! absolute (issuance + 2 minutes); single-use enforcement belongs to the
//! exchange endpoint, which is an external collaborator.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::AppError;

/// Authorization code lifetime.
pub const CODE_TTL_SECONDS: i64 = 120;

type HmacSha256 = Hmac<Sha256>;

/// The claims bound into an authorization code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCodeClaims {
    pub client_id: String,
    pub username: String,
    pub approved_scopes: String,
    pub redirect_uri: String,
    pub code_challenge: String,
    /// Absolute expiry, seconds since the epoch.
    pub expires_at: i64,
}

#[derive(Clone)]
pub struct AuthorizationCodeCodec {
    key: Vec<u8>,
}

impl AuthorizationCodeCodec {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Issue a code for the given approval, expiring `CODE_TTL_SECONDS`
    /// after `now`.
    pub fn issue(
        &self,
        client_id: &str,
        username: &str,
        approved_scopes: &str,
        redirect_uri: &str,
        code_challenge: &str,
        now: DateTime<Utc>,
    ) -> String {
        let claims = AuthorizationCodeClaims {
            client_id: client_id.to_string(),
            username: username.to_string(),
            approved_scopes: approved_scopes.to_string(),
            redirect_uri: redirect_uri.to_string(),
            code_challenge: code_challenge.to_string(),
            expires_at: (now + Duration::seconds(CODE_TTL_SECONDS)).timestamp(),
        };
        let json = serde_json::to_vec(&claims).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(&json);
        let tag = URL_SAFE_NO_PAD.encode(self.tag(payload.as_bytes()));
        format!("{payload}.{tag}")
    }

    /// Verify and decode a code. Rejects bad signatures and expired codes.
    pub fn decode(&self, code: &str, now: DateTime<Utc>) -> Result<AuthorizationCodeClaims, AppError> {
        let (payload, tag) = code
            .split_once('.')
            .ok_or_else(|| AppError::InvalidRequest("malformed authorization code".to_string()))?;

        let tag_bytes = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| AppError::InvalidRequest("malformed authorization code".to_string()))?;
        let expected = self.tag(payload.as_bytes());
        if tag_bytes.ct_eq(&expected).unwrap_u8() != 1 {
            return Err(AppError::InvalidRequest(
                "authorization code signature mismatch".to_string(),
            ));
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AppError::InvalidRequest("malformed authorization code".to_string()))?;
        let claims: AuthorizationCodeClaims = serde_json::from_slice(&json)
            .map_err(|_| AppError::InvalidRequest("malformed authorization code".to_string()))?;

        if now.timestamp() >= claims.expires_at {
            return Err(AppError::InvalidRequest(
                "authorization code has expired".to_string(),
            ));
        }
        Ok(claims)
    }

    fn tag(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .expect("HMAC accepts keys of any length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}
