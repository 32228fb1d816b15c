//! Entitlement provider webhook signature verification.
//!
//! The provider signs the exact raw body with a shared secret and sends the
//! base64 HMAC in a header. No timestamp is signed, so replays are handled
//! by the idempotency ledger rather than here.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::WebhookError;

/// HMAC digest used for entitlement webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

/// Verifier for entitlement webhook signatures.
#[derive(Clone)]
pub struct EntitlementWebhookVerifier {
    secret: SecretString,
    algorithm: SignatureAlgorithm,
}

impl EntitlementWebhookVerifier {
    pub fn new(secret: SecretString, algorithm: SignatureAlgorithm) -> Self {
        Self { secret, algorithm }
    }

    /// Checks the base64 signature header against the raw body.
    ///
    /// # Errors
    ///
    /// - `MissingSignature` - header absent or blank
    /// - `InvalidSignature` - undecodable base64 or digest mismatch
    pub fn verify(&self, payload: &[u8], signature_header: Option<&str>) -> Result<(), WebhookError> {
        let header = signature_header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(WebhookError::MissingSignature)?;

        let provided = BASE64
            .decode(header)
            .map_err(|_| WebhookError::InvalidSignature)?;

        let expected = self.compute_signature(payload)?;

        if !constant_time_compare(&expected, &provided) {
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }

    /// Base64 signature for `payload`, as the provider would send it.
    pub fn sign(&self, payload: &[u8]) -> Result<String, WebhookError> {
        Ok(BASE64.encode(self.compute_signature(payload)?))
    }

    fn compute_signature(&self, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let key = self.secret.expose_secret().as_bytes();
        let digest = match self.algorithm {
            SignatureAlgorithm::Sha1 => {
                let mut mac = Hmac::<Sha1>::new_from_slice(key)
                    .map_err(|_| WebhookError::InvalidSignature)?;
                mac.update(payload);
                mac.finalize().into_bytes().to_vec()
            }
            SignatureAlgorithm::Sha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key)
                    .map_err(|_| WebhookError::InvalidSignature)?;
                mac.update(payload);
                mac.finalize().into_bytes().to_vec()
            }
        };
        Ok(digest)
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
