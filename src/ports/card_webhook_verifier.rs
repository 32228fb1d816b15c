//! CardWebhookVerifier port - authenticate and parse card gateway webhooks.
//!
//! The gateway's signing convention is opaque to the application layer:
//! it hands over the raw body and signature header and gets back a typed
//! event or a `WebhookError`.

use crate::domain::billing::{CardEvent, WebhookError};

/// Verifies a signed card webhook and parses its payload.
pub trait CardWebhookVerifier: Send + Sync {
    /// # Errors
    ///
    /// - `MissingSignature` / `InvalidSignature` - authentication failed
    /// - `TimestampOutOfRange` / `InvalidTimestamp` - replay window violated
    /// - `ParseError` - header or JSON payload malformed
    fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<CardEvent, WebhookError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_webhook_verifier_is_object_safe() {
        fn _accepts_dyn(_verifier: &dyn CardWebhookVerifier) {}
    }
}
