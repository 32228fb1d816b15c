//! BillingStore port - transactional writer for billing events.
//!
//! Each call is one atomic unit: ledger check, state read, planning and
//! every write commit together or not at all. Implementations must make
//! concurrent duplicates of the same event id resolve to exactly one
//! `Applied`; the losers report `Deduped`.

use async_trait::async_trait;

use crate::domain::billing::{ApplyOutcome, PaymentCompletion, SubscriptionUpdate};
use crate::domain::foundation::DomainError;

/// Write side of billing reconciliation.
///
/// Planning is delegated to `plan_subscription_write` and
/// `plan_payment_write`; implementations only supply atomicity and storage.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Applies a resolved subscription event for one user.
    ///
    /// Returns `Deduped` for a known event id, `Stale` when the event is not
    /// newer than the stored state, `Applied` otherwise.
    async fn apply_subscription_event(
        &self,
        update: &SubscriptionUpdate,
    ) -> Result<ApplyOutcome, DomainError>;

    /// Completes a gift/boost checkout session and updates wish funding.
    ///
    /// `boost_hours` is the length of a boost window counted from now.
    async fn apply_payment_completion(
        &self,
        completion: &PaymentCompletion,
        boost_hours: i64,
    ) -> Result<ApplyOutcome, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_store_is_object_safe_and_send_sync() {
        fn _accepts_dyn(_store: &dyn BillingStore) {}
        fn _assert_send_sync<T: Send + Sync + ?Sized>() {}
        _assert_send_sync::<std::sync::Arc<dyn BillingStore>>();
    }
}
