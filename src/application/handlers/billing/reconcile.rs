//! Shared path from a normalized event to the transactional writer.

use crate::domain::billing::{
    resolve_status, ApplyOutcome, EventKind, NormalizedEvent, PaymentCompletion, PlanCatalog,
    SubscriptionUpdate, WebhookError, DEFAULT_BOOST_HOURS,
};
use crate::ports::BillingStore;

/// Static reconciliation settings, built once at startup.
#[derive(Debug, Clone)]
pub struct BillingPolicy {
    pub plans: PlanCatalog,
    pub boost_hours: i64,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            plans: PlanCatalog::default(),
            boost_hours: DEFAULT_BOOST_HOURS,
        }
    }
}

/// Resolves and writes one normalized event.
pub(super) async fn reconcile(
    store: &dyn BillingStore,
    policy: &BillingPolicy,
    event: NormalizedEvent,
) -> Result<ApplyOutcome, WebhookError> {
    let Some(kind) = event.kind else {
        tracing::info!(
            event_id = %event.event_id,
            subject = %event.subject_user_id,
            raw_kind = %event.raw_kind,
            "Ignoring unrecognized billing event"
        );
        return Ok(ApplyOutcome::Ignored);
    };

    let outcome = if kind == EventKind::PaymentCompleted {
        let Some(payment) = event.payment else {
            tracing::warn!(
                event_id = %event.event_id,
                raw_kind = %event.raw_kind,
                "Payment event without checkout details"
            );
            return Ok(ApplyOutcome::Ignored);
        };
        let completion = PaymentCompletion {
            event_id: event.event_id.clone(),
            payer_user_id: event.subject_user_id.clone(),
            session_id: payment.session_id,
            purpose: payment.purpose,
            occurred_at_ms: event.occurred_at_ms,
        };
        store
            .apply_payment_completion(&completion, policy.boost_hours)
            .await
    } else {
        let Some(status) = resolve_status(kind, event.period_type) else {
            return Ok(ApplyOutcome::Ignored);
        };
        let update = SubscriptionUpdate {
            event_id: event.event_id.clone(),
            provider: event.provider,
            user_id: event.subject_user_id.clone(),
            kind,
            status,
            plan_key: policy.plans.plan_for(event.product_ref.as_deref()),
            product_ref: event.product_ref.clone(),
            period_end: event.period_end,
            is_sandbox: event.is_sandbox,
            occurred_at_ms: event.occurred_at_ms,
        };
        store.apply_subscription_event(&update).await
    };

    match outcome {
        Ok(outcome) => {
            tracing::info!(
                event_id = %event.event_id,
                subject = %event.subject_user_id,
                raw_kind = %event.raw_kind,
                provider = %event.provider,
                outcome = %outcome,
                "Billing event reconciled"
            );
            Ok(outcome)
        }
        Err(e) => {
            tracing::error!(
                event_id = %event.event_id,
                subject = %event.subject_user_id,
                raw_kind = %event.raw_kind,
                error = %e,
                "Failed to write billing event"
            );
            Err(e.into())
        }
    }
}
