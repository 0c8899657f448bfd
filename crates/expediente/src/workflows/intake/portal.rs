//! Self-contained signed portal tokens. A token binds a client id and
//! an expiry instant; verification needs no database lookup. There is
//! no revocation list; the TTL is the only defense after compromise.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

use super::domain::ClientId;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct TokenPayload {
    client_id: ClientId,
    exp: i64,
}

/// Issues and verifies portal capability tokens.
#[derive(Clone)]
pub struct PortalTokens {
    secret: String,
    ttl_seconds: i64,
}

impl PortalTokens {
    pub fn new(secret: impl Into<String>, ttl_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_seconds,
        }
    }

    /// Create a signed token bound to a client id, expiring after the
    /// configured TTL. Format: `base64url(payload).hex(hmac_sha256)`.
    pub fn create(&self, client_id: &ClientId) -> String {
        self.create_with_ttl(client_id, self.ttl_seconds)
    }

    pub fn create_with_ttl(&self, client_id: &ClientId, ttl_seconds: i64) -> String {
        let payload = json!({
            "client_id": client_id,
            "exp": Utc::now().timestamp() + ttl_seconds,
        })
        .to_string();
        let encoded = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        let signature = hex::encode(self.sign(encoded.as_bytes()));
        format!("{encoded}.{signature}")
    }

    /// Verify token integrity, expiry, and client binding. The MAC
    /// check is constant-time and runs before the payload is parsed.
    pub fn verify(&self, token: &str, expected_client_id: &ClientId) -> bool {
        let Some((payload_b64, signature_hex)) = token.split_once('.') else {
            return false;
        };
        let Ok(signature) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.as_bytes()) else {
            return false;
        };
        mac.update(payload_b64.as_bytes());
        if mac.verify_slice(&signature).is_err() {
            return false;
        }

        let Ok(raw) = URL_SAFE_NO_PAD.decode(payload_b64) else {
            return false;
        };
        let Ok(payload) = serde_json::from_slice::<TokenPayload>(&raw) else {
            return false;
        };

        payload.client_id == *expected_client_id && payload.exp >= Utc::now().timestamp()
    }

    /// UNIX expiry instant of a token, when the payload parses at all.
    /// Does not check the signature; callers use this for display only.
    pub fn token_expiration(token: &str) -> Option<i64> {
        let (payload_b64, _) = token.split_once('.')?;
        let raw = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let payload = serde_json::from_slice::<TokenPayload>(&raw).ok()?;
        Some(payload.exp)
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let mut mac = match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mac) => mac,
            // HMAC accepts keys of any length; unreachable in practice.
            Err(_) => return Vec::new(),
        };
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }
}
