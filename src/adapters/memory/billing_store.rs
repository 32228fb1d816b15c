//! In-memory billing store for tests and local development.
//!
//! One async mutex guards every table, so each write is trivially atomic.
//! Not for production use: state is lost on restart and all subjects
//! serialize on the same lock.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::domain::billing::{
    plan_payment_write, plan_subscription_write, ApplyOutcome, BillingProvider, FundingRecord,
    PaymentCompletion, PaymentSession, PaymentWritePlan, ProcessedEvent, SubscriptionState,
    SubscriptionUpdate, SubscriptionWritePlan, UserEntitlement,
};
use crate::domain::foundation::{CheckoutSessionId, DomainError, EventId, Timestamp, UserId, WishId};
use crate::ports::{BillingReader, BillingStore};

/// Provider event ids are only unique within one provider.
type LedgerKey = (BillingProvider, EventId);

fn ledger_key(event: &ProcessedEvent) -> LedgerKey {
    (event.provider, event.event_id.clone())
}

#[derive(Default)]
struct Tables {
    subscriptions: HashMap<UserId, SubscriptionState>,
    entitlements: HashMap<UserId, UserEntitlement>,
    ledger: HashMap<LedgerKey, ProcessedEvent>,
    sessions: HashMap<CheckoutSessionId, PaymentSession>,
    funding: HashMap<WishId, FundingRecord>,
}

/// In-memory implementation of `BillingStore` and `BillingReader`.
#[derive(Default)]
pub struct InMemoryBillingStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Makes every subsequent write fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Records a pending checkout session, as the checkout builder would.
    pub async fn insert_session(&self, session: PaymentSession) {
        self.tables
            .lock()
            .await
            .sessions
            .insert(session.session_id.clone(), session);
    }

    pub async fn get_session(&self, session_id: &CheckoutSessionId) -> Option<PaymentSession> {
        self.tables.lock().await.sessions.get(session_id).cloned()
    }

    /// Number of ledger rows.
    pub async fn ledger_len(&self) -> usize {
        self.tables.lock().await.ledger.len()
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("billing store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn apply_subscription_event(
        &self,
        update: &SubscriptionUpdate,
    ) -> Result<ApplyOutcome, DomainError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let plan = plan_subscription_write(
            tables
                .ledger
                .contains_key(&(update.provider, update.event_id.clone())),
            tables.subscriptions.get(&update.user_id),
            update,
            Timestamp::now(),
        );
        let outcome = plan.outcome();

        match plan {
            SubscriptionWritePlan::Deduped => {}
            SubscriptionWritePlan::RecordStale { ledger } => {
                tables.ledger.insert(ledger_key(&ledger), ledger);
            }
            SubscriptionWritePlan::Apply {
                state,
                entitlement,
                ledger,
            } => {
                tables.subscriptions.insert(state.user_id.clone(), state);
                tables
                    .entitlements
                    .insert(entitlement.user_id.clone(), entitlement);
                tables.ledger.insert(ledger_key(&ledger), ledger);
            }
        }

        Ok(outcome)
    }

    async fn apply_payment_completion(
        &self,
        completion: &PaymentCompletion,
        boost_hours: i64,
    ) -> Result<ApplyOutcome, DomainError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let plan = plan_payment_write(
            tables
                .ledger
                .contains_key(&(BillingProvider::Card, completion.event_id.clone())),
            tables.sessions.get(&completion.session_id),
            tables.funding.get(completion.purpose.wish_id()),
            completion,
            boost_hours,
            Timestamp::now(),
        );
        let outcome = plan.outcome();

        match plan {
            PaymentWritePlan::Deduped { ledger } => {
                if let Some(ledger) = ledger {
                    tables.ledger.insert(ledger_key(&ledger), ledger);
                }
            }
            PaymentWritePlan::Apply {
                session,
                funding,
                ledger,
            } => {
                tables.sessions.insert(session.session_id.clone(), session);
                tables.funding.insert(funding.wish_id.clone(), funding);
                tables.ledger.insert(ledger_key(&ledger), ledger);
            }
        }

        Ok(outcome)
    }
}

#[async_trait]
impl BillingReader for InMemoryBillingStore {
    async fn get_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionState>, DomainError> {
        Ok(self.tables.lock().await.subscriptions.get(user_id).cloned())
    }

    async fn get_entitlement(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserEntitlement>, DomainError> {
        Ok(self.tables.lock().await.entitlements.get(user_id).cloned())
    }

    async fn get_funding(&self, wish_id: &WishId) -> Result<Option<FundingRecord>, DomainError> {
        Ok(self.tables.lock().await.funding.get(wish_id).cloned())
    }

    async fn find_processed_event(
        &self,
        provider: BillingProvider,
        event_id: &EventId,
    ) -> Result<Option<ProcessedEvent>, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .ledger
            .get(&(provider, event_id.clone()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{
        EventKind, PaymentPurpose, PaymentSessionStatus, SubscriptionStatus,
    };
    use std::sync::Arc;

    fn update(id: &str, status: SubscriptionStatus, at: i64) -> SubscriptionUpdate {
        SubscriptionUpdate {
            event_id: EventId::new(id).unwrap(),
            provider: BillingProvider::Entitlement,
            user_id: UserId::new("u1").unwrap(),
            kind: EventKind::SubscriptionActivated,
            status,
            product_ref: Some("patron_monthly".to_string()),
            plan_key: Some("patron_monthly".to_string()),
            period_end: None,
            is_sandbox: false,
            occurred_at_ms: at,
        }
    }

    fn gift(event: &str, session: &str) -> PaymentCompletion {
        PaymentCompletion {
            event_id: EventId::new(event).unwrap(),
            payer_user_id: UserId::new("payer").unwrap(),
            session_id: CheckoutSessionId::new(session).unwrap(),
            purpose: PaymentPurpose::Gift {
                wish_id: WishId::new("w1").unwrap(),
                amount: 30,
            },
            occurred_at_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn applies_and_dedupes_subscription_event() {
        let store = InMemoryBillingStore::new();
        let upd = update("e1", SubscriptionStatus::Active, 1_000);

        assert_eq!(store.apply_subscription_event(&upd).await.unwrap(), ApplyOutcome::Applied);
        assert_eq!(store.apply_subscription_event(&upd).await.unwrap(), ApplyOutcome::Deduped);
        assert_eq!(store.ledger_len().await, 1);

        let user = UserId::new("u1").unwrap();
        let state = store.get_subscription(&user).await.unwrap().unwrap();
        assert_eq!(state.status, SubscriptionStatus::Active);
        assert!(store.get_entitlement(&user).await.unwrap().unwrap().is_supporter);
    }

    #[tokio::test]
    async fn stale_event_only_writes_ledger() {
        let store = InMemoryBillingStore::new();
        store
            .apply_subscription_event(&update("e1", SubscriptionStatus::Active, 1_000))
            .await
            .unwrap();

        let outcome = store
            .apply_subscription_event(&update("e2", SubscriptionStatus::Canceled, 500))
            .await
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::Stale);
        let state = store
            .get_subscription(&UserId::new("u1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.status, SubscriptionStatus::Active);
        let ledger = store
            .find_processed_event(BillingProvider::Entitlement, &EventId::new("e2").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(ledger.stale);
    }

    #[tokio::test]
    async fn concurrent_duplicates_apply_once() {
        let store = Arc::new(InMemoryBillingStore::new());
        let upd = update("e1", SubscriptionStatus::Active, 1_000);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let upd = upd.clone();
            handles.push(tokio::spawn(async move {
                store.apply_subscription_event(&upd).await.unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap() == ApplyOutcome::Applied {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(store.ledger_len().await, 1);
    }

    #[tokio::test]
    async fn gift_funds_wish_once_per_session() {
        let store = InMemoryBillingStore::new();

        assert_eq!(
            store.apply_payment_completion(&gift("evt_1", "s1"), 24).await.unwrap(),
            ApplyOutcome::Applied
        );
        assert_eq!(
            store.apply_payment_completion(&gift("evt_1", "s1"), 24).await.unwrap(),
            ApplyOutcome::Deduped
        );
        assert_eq!(
            store.apply_payment_completion(&gift("evt_2", "s1"), 24).await.unwrap(),
            ApplyOutcome::Deduped
        );

        let funding = store
            .get_funding(&WishId::new("w1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(funding.funding_raised, 30);
        assert_eq!(funding.funding_supporters, 1);
        assert_eq!(store.ledger_len().await, 2);
    }

    #[tokio::test]
    async fn pending_session_is_marked_completed() {
        let store = InMemoryBillingStore::new();
        let session_id = CheckoutSessionId::new("s1").unwrap();
        store
            .insert_session(PaymentSession {
                session_id: session_id.clone(),
                payer_user_id: UserId::new("payer").unwrap(),
                purpose: PaymentPurpose::Gift {
                    wish_id: WishId::new("w1").unwrap(),
                    amount: 30,
                },
                status: PaymentSessionStatus::Pending,
                completed_at: None,
            })
            .await;

        store.apply_payment_completion(&gift("evt_1", "s1"), 24).await.unwrap();

        let session = store.get_session(&session_id).await.unwrap();
        assert!(session.is_completed());
        assert!(session.completed_at.is_some());
    }

    #[tokio::test]
    async fn same_event_id_from_each_provider_is_applied() {
        let store = InMemoryBillingStore::new();
        let entitlement_event = update("evt_1", SubscriptionStatus::Active, 1_000);
        let mut card_event = update("evt_1", SubscriptionStatus::Active, 1_000);
        card_event.provider = BillingProvider::Card;
        card_event.user_id = UserId::new("u2").unwrap();

        assert_eq!(
            store.apply_subscription_event(&entitlement_event).await.unwrap(),
            ApplyOutcome::Applied
        );
        assert_eq!(
            store.apply_subscription_event(&card_event).await.unwrap(),
            ApplyOutcome::Applied
        );
        assert_eq!(
            store.apply_payment_completion(&gift("evt_1", "s1"), 24).await.unwrap(),
            ApplyOutcome::Deduped
        );

        let u2 = UserId::new("u2").unwrap();
        assert!(store.get_subscription(&u2).await.unwrap().is_some());
        assert!(store.get_entitlement(&u2).await.unwrap().unwrap().is_supporter);
        assert_eq!(store.ledger_len().await, 2);

        let id = EventId::new("evt_1").unwrap();
        let card_row = store
            .find_processed_event(BillingProvider::Card, &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(card_row.subject_user_id, u2);
        let entitlement_row = store
            .find_processed_event(BillingProvider::Entitlement, &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entitlement_row.subject_user_id.as_str(), "u1");
    }

    #[tokio::test]
    async fn unavailable_store_writes_nothing() {
        let store = InMemoryBillingStore::new();
        store.set_unavailable(true);

        let result = store
            .apply_subscription_event(&update("e1", SubscriptionStatus::Active, 1_000))
            .await;

        assert!(result.is_err());
        assert_eq!(store.ledger_len().await, 0);
    }
}
