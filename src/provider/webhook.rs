use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::ProviderConfig;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC of the webhook body.
pub const SIGNATURE_HEADER: &str = "bz-signature";

/// Authenticates inbound notification payloads against the shared payment key.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    payment_key: String,
}

impl WebhookVerifier {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            payment_key: config.payment_key.clone(),
        }
    }

    /// Verify a notification delivery. The signature covers the raw body
    /// bytes as received - verification MUST run before any JSON parsing,
    /// since re-serialized structures would not match bytes-on-the-wire.
    pub fn verify(&self, headers: &HeaderMap, raw_body: &[u8]) -> bool {
        let signature = match headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
            Some(s) => s,
            None => {
                tracing::debug!("webhook missing or undecodable {} header", SIGNATURE_HEADER);
                return false;
            }
        };

        let mut mac = match HmacSha256::new_from_slice(self.payment_key.as_bytes()) {
            Ok(m) => m,
            Err(_) => return false,
        };
        mac.update(raw_body);
        let expected = hex::encode(mac.finalize().into_bytes());

        // Constant-time comparison to prevent timing attacks. The length
        // check is not constant-time, but signature length is not secret
        // (always 64 hex chars for SHA-256).
        let expected_bytes = expected.as_bytes();
        let provided_bytes = signature.as_bytes();
        if expected_bytes.len() != provided_bytes.len() {
            return false;
        }

        expected_bytes.ct_eq(provided_bytes).into()
    }
}
