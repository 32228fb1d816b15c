//! HandleEntitlementWebhookHandler - Command handler for entitlement provider webhooks.

use std::sync::Arc;

use super::reconcile::{reconcile, BillingPolicy};
use crate::domain::billing::{
    normalize_entitlement_event, ApplyOutcome, EntitlementEvent, EntitlementWebhookVerifier,
    WebhookError,
};
use crate::domain::foundation::Timestamp;
use crate::ports::BillingStore;

/// Command to handle an entitlement provider webhook.
#[derive(Debug, Clone)]
pub struct HandleEntitlementWebhookCommand {
    /// Raw webhook body, exactly as received.
    pub payload: Vec<u8>,
    /// Base64 HMAC header, if present.
    pub signature: Option<String>,
}

/// Handler for entitlement provider webhooks.
pub struct HandleEntitlementWebhookHandler {
    verifier: EntitlementWebhookVerifier,
    store: Arc<dyn BillingStore>,
    policy: Arc<BillingPolicy>,
}

impl HandleEntitlementWebhookHandler {
    pub fn new(
        verifier: EntitlementWebhookVerifier,
        store: Arc<dyn BillingStore>,
        policy: Arc<BillingPolicy>,
    ) -> Self {
        Self {
            verifier,
            store,
            policy,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleEntitlementWebhookCommand,
    ) -> Result<ApplyOutcome, WebhookError> {
        self.verifier
            .verify(&cmd.payload, cmd.signature.as_deref())
            .map_err(|e| {
                tracing::warn!("Entitlement webhook rejected: {}", e);
                e
            })?;

        let event = EntitlementEvent::from_slice(&cmd.payload)?;
        let normalized = normalize_entitlement_event(&event, Timestamp::now()).map_err(|e| {
            tracing::warn!(
                raw_kind = event.event_type.as_deref().unwrap_or("unknown"),
                error = %e,
                "Malformed entitlement event"
            );
            e
        })?;

        reconcile(self.store.as_ref(), &self.policy, normalized).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::{
        BillingProvider, PlanCatalog, SignatureAlgorithm, SubscriptionStatus,
    };
    use crate::domain::foundation::{EventId, UserId};
    use crate::ports::BillingReader;
    use secrecy::SecretString;

    const SECRET: &str = "entitlement_test_secret";

    fn verifier() -> EntitlementWebhookVerifier {
        EntitlementWebhookVerifier::new(SecretString::new(SECRET.to_string()), SignatureAlgorithm::Sha1)
    }

    fn setup() -> (HandleEntitlementWebhookHandler, Arc<InMemoryBillingStore>) {
        let store = Arc::new(InMemoryBillingStore::new());
        let policy = BillingPolicy {
            plans: PlanCatalog::parse("patron_monthly,patron_yearly").unwrap(),
            boost_hours: 24,
        };
        let handler =
            HandleEntitlementWebhookHandler::new(verifier(), store.clone(), Arc::new(policy));
        (handler, store)
    }

    fn signed(body: &str) -> HandleEntitlementWebhookCommand {
        HandleEntitlementWebhookCommand {
            payload: body.as_bytes().to_vec(),
            signature: Some(verifier().sign(body.as_bytes()).unwrap()),
        }
    }

    const INITIAL: &str = r#"{"id":"e1","type":"INITIAL_PURCHASE","app_user_id":"u1","product_id":"patron_monthly","event_timestamp_ms":1000}"#;
    const LATE_CANCEL: &str = r#"{"id":"e2","type":"CANCELLATION","app_user_id":"u1","product_id":"patron_monthly","event_timestamp_ms":500}"#;

    async fn status_of(store: &InMemoryBillingStore, user: &str) -> SubscriptionStatus {
        store
            .get_subscription(&UserId::new(user).unwrap())
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn initial_purchase_activates_subscription() {
        let (handler, store) = setup();

        let outcome = handler.handle(signed(INITIAL)).await.unwrap();

        assert_eq!(outcome, ApplyOutcome::Applied);
        let state = store
            .get_subscription(&UserId::new("u1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.status, SubscriptionStatus::Active);
        assert_eq!(state.plan_key.as_deref(), Some("patron_monthly"));
        assert!(state.is_entitled());
    }

    #[tokio::test]
    async fn replay_is_deduped() {
        let (handler, store) = setup();
        handler.handle(signed(INITIAL)).await.unwrap();

        let outcome = handler.handle(signed(INITIAL)).await.unwrap();

        assert_eq!(outcome, ApplyOutcome::Deduped);
        assert_eq!(store.ledger_len().await, 1);
    }

    #[tokio::test]
    async fn late_cancellation_is_stale() {
        let (handler, store) = setup();
        handler.handle(signed(INITIAL)).await.unwrap();

        let outcome = handler.handle(signed(LATE_CANCEL)).await.unwrap();

        assert_eq!(outcome, ApplyOutcome::Stale);
        assert_eq!(status_of(&store, "u1").await, SubscriptionStatus::Active);
        let ledger = store
            .find_processed_event(BillingProvider::Entitlement, &EventId::new("e2").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(ledger.stale);
    }

    #[tokio::test]
    async fn trial_purchase_is_trialing() {
        let (handler, store) = setup();
        let body = r#"{"event":{"id":"e1","type":"INITIAL_PURCHASE","app_user_id":"u1","period_type":"TRIAL","event_timestamp_ms":1000}}"#;

        handler.handle(signed(body)).await.unwrap();

        assert_eq!(status_of(&store, "u1").await, SubscriptionStatus::Trialing);
    }

    #[tokio::test]
    async fn sandbox_purchase_grants_no_entitlement() {
        let (handler, store) = setup();
        let body = r#"{"id":"e1","type":"INITIAL_PURCHASE","app_user_id":"u1","environment":"SANDBOX","event_timestamp_ms":1000}"#;

        handler.handle(signed(body)).await.unwrap();

        let entitlement = store
            .get_entitlement(&UserId::new("u1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(!entitlement.is_supporter);
    }

    #[tokio::test]
    async fn unknown_type_is_ignored() {
        let (handler, store) = setup();
        let body = r#"{"id":"e1","type":"TRANSFER","app_user_id":"u1"}"#;

        let outcome = handler.handle(signed(body)).await.unwrap();

        assert_eq!(outcome, ApplyOutcome::Ignored);
        assert_eq!(store.ledger_len().await, 0);
    }

    #[tokio::test]
    async fn missing_subject_is_rejected_without_ledger_row() {
        let (handler, store) = setup();
        let body = r#"{"id":"e1","type":"INITIAL_PURCHASE","product_id":"patron_monthly"}"#;

        let result = handler.handle(signed(body)).await;

        assert!(matches!(result, Err(WebhookError::MissingField("app_user_id"))));
        assert_eq!(store.ledger_len().await, 0);
    }

    #[tokio::test]
    async fn unsigned_request_is_rejected() {
        let (handler, _store) = setup();
        let cmd = HandleEntitlementWebhookCommand {
            payload: INITIAL.as_bytes().to_vec(),
            signature: None,
        };

        let result = handler.handle(cmd).await;

        assert!(matches!(result, Err(WebhookError::MissingSignature)));
    }
}
