//! Stripe-convention card gateway adapter.
//!
//! Implements the `CardWebhookVerifier` port: HMAC-SHA256 signatures with
//! constant-time comparison and a 5-minute replay window. The signing
//! secret is held as `secrecy::SecretString`.

mod webhook_verifier;

pub use webhook_verifier::{SignatureHeader, StripeWebhookVerifier};
