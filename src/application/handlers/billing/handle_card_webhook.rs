//! HandleCardWebhookHandler - Command handler for card gateway webhooks.

use std::sync::Arc;

use super::reconcile::{reconcile, BillingPolicy};
use crate::domain::billing::{normalize_card_event, ApplyOutcome, WebhookError};
use crate::domain::foundation::Timestamp;
use crate::ports::{BillingStore, CardWebhookVerifier};

/// Command to handle a card gateway webhook.
#[derive(Debug, Clone)]
pub struct HandleCardWebhookCommand {
    /// Raw webhook body, exactly as received.
    pub payload: Vec<u8>,
    /// Signature header, if present.
    pub signature: Option<String>,
}

/// Handler for card gateway webhooks.
///
/// Verifies and parses through the `CardWebhookVerifier` port, normalizes,
/// then writes subscription or payment state in one transaction.
pub struct HandleCardWebhookHandler {
    verifier: Arc<dyn CardWebhookVerifier>,
    store: Arc<dyn BillingStore>,
    policy: Arc<BillingPolicy>,
}

impl HandleCardWebhookHandler {
    pub fn new(
        verifier: Arc<dyn CardWebhookVerifier>,
        store: Arc<dyn BillingStore>,
        policy: Arc<BillingPolicy>,
    ) -> Self {
        Self {
            verifier,
            store,
            policy,
        }
    }

    pub async fn handle(&self, cmd: HandleCardWebhookCommand) -> Result<ApplyOutcome, WebhookError> {
        let event = self
            .verifier
            .verify_and_parse(&cmd.payload, cmd.signature.as_deref())
            .map_err(|e| {
                tracing::warn!("Card webhook rejected: {}", e);
                e
            })?;

        let normalized = match normalize_card_event(&event, Timestamp::now()) {
            Ok(normalized) => normalized,
            Err(WebhookError::Ignored(reason)) => {
                tracing::info!(
                    event_id = %event.id,
                    raw_kind = %event.event_type,
                    reason = %reason,
                    "Ignoring card event"
                );
                return Ok(ApplyOutcome::Ignored);
            }
            Err(e) => {
                tracing::warn!(
                    event_id = %event.id,
                    raw_kind = %event.event_type,
                    error = %e,
                    "Malformed card event"
                );
                return Err(e);
            }
        };

        reconcile(self.store.as_ref(), &self.policy, normalized).await
    }
}
