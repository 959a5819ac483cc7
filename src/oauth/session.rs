//! Client-carried session state.
//!
//! The pending authorization request (plus the authenticated username once
//! login has succeeded) travels between the flow's unauthenticated HTTP
//! steps inside one opaque cookie value. The encoding is versioned JSON with
//! an HMAC-SHA256 tag, so a tampered or truncated cookie decodes to an empty
//! request instead of a partially attacker-controlled one.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::oauth::request::AuthorizationRequest;

const VERSION: &str = "v1";

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct SessionStateCodec {
    key: Vec<u8>,
}

impl SessionStateCodec {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Encode the request as `v1.<base64url(json)>.<base64url(tag)>`.
    pub fn encode(&self, request: &AuthorizationRequest) -> String {
        // AuthorizationRequest contains no non-serializable values, so this
        // cannot fail in practice.
        let json = serde_json::to_vec(request).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(&json);
        let tag = URL_SAFE_NO_PAD.encode(self.tag(payload.as_bytes()));
        format!("{VERSION}.{payload}.{tag}")
    }

    /// Decode a cookie value. Total: any malformed, tampered or mis-versioned
    /// input yields a default (empty) request, which callers detect through
    /// an empty `client_id`.
    pub fn decode(&self, value: &str) -> AuthorizationRequest {
        let mut parts = value.splitn(3, '.');
        let (version, payload, tag) = match (parts.next(), parts.next(), parts.next()) {
            (Some(v), Some(p), Some(t)) => (v, p, t),
            _ => return AuthorizationRequest::default(),
        };
        if version != VERSION {
            return AuthorizationRequest::default();
        }

        let Ok(tag_bytes) = URL_SAFE_NO_PAD.decode(tag) else {
            return AuthorizationRequest::default();
        };
        let expected = self.tag(payload.as_bytes());
        if tag_bytes.ct_eq(&expected).unwrap_u8() != 1 {
            tracing::warn!("session state signature mismatch");
            return AuthorizationRequest::default();
        }

        let Ok(json) = URL_SAFE_NO_PAD.decode(payload) else {
            return AuthorizationRequest::default();
        };
        serde_json::from_slice(&json).unwrap_or_default()
    }

    fn tag(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .expect("HMAC accepts keys of any length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}
