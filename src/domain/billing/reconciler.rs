//! Write planning for the transactional writer.
//!
//! Store adapters open a transaction, read the ledger hit and the current
//! rows, then call one of the planners below and persist exactly what the
//! plan says before committing. Keeping the decision here means every store
//! applies identical dedup, ordering and funding rules.

use super::{
    entitlement_for, should_apply, ApplyOutcome, BillingProvider, EventKind, FundingRecord,
    PaymentPurpose, PaymentSession, PaymentSessionStatus, ProcessedEvent, SubscriptionState,
    SubscriptionStatus, UserEntitlement,
};
use crate::domain::foundation::{CheckoutSessionId, EventId, Timestamp, UserId};

/// Default length of a purchased boost.
pub const DEFAULT_BOOST_HOURS: i64 = 24;

/// A resolved subscription event, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub event_id: EventId,
    pub provider: BillingProvider,
    pub user_id: UserId,
    pub kind: EventKind,
    pub status: SubscriptionStatus,
    pub product_ref: Option<String>,
    pub plan_key: Option<String>,
    pub period_end: Option<Timestamp>,
    pub is_sandbox: bool,
    pub occurred_at_ms: i64,
}

/// What the writer must persist for a subscription event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionWritePlan {
    /// Event id already in the ledger. Write nothing.
    Deduped,
    /// Older than the stored state. Write only the ledger row.
    RecordStale { ledger: ProcessedEvent },
    /// Write state, entitlement and ledger row together.
    Apply {
        state: SubscriptionState,
        entitlement: UserEntitlement,
        ledger: ProcessedEvent,
    },
}

impl SubscriptionWritePlan {
    pub fn outcome(&self) -> ApplyOutcome {
        match self {
            SubscriptionWritePlan::Deduped => ApplyOutcome::Deduped,
            SubscriptionWritePlan::RecordStale { .. } => ApplyOutcome::Stale,
            SubscriptionWritePlan::Apply { .. } => ApplyOutcome::Applied,
        }
    }
}

/// Decides how a subscription event changes stored state.
pub fn plan_subscription_write(
    already_recorded: bool,
    current: Option<&SubscriptionState>,
    update: &SubscriptionUpdate,
    now: Timestamp,
) -> SubscriptionWritePlan {
    if already_recorded {
        return SubscriptionWritePlan::Deduped;
    }

    let fresh = should_apply(current.map(|s| s.last_event_at_ms), update.occurred_at_ms);
    let ledger = ProcessedEvent {
        event_id: update.event_id.clone(),
        provider: update.provider,
        subject_user_id: update.user_id.clone(),
        kind: update.kind,
        status: Some(update.status),
        occurred_at_ms: update.occurred_at_ms,
        stale: !fresh,
        recorded_at: now,
    };

    if !fresh {
        return SubscriptionWritePlan::RecordStale { ledger };
    }

    let state = SubscriptionState {
        user_id: update.user_id.clone(),
        status: update.status,
        provider: update.provider,
        product_ref: update.product_ref.clone(),
        plan_key: update.plan_key.clone(),
        is_sandbox: update.is_sandbox,
        current_period_end: update.period_end,
        last_event_id: update.event_id.clone(),
        last_event_at_ms: update.occurred_at_ms,
        updated_at: now,
    };
    let entitlement = UserEntitlement {
        user_id: update.user_id.clone(),
        is_supporter: entitlement_for(update.status, update.is_sandbox),
        updated_at: now,
    };

    SubscriptionWritePlan::Apply {
        state,
        entitlement,
        ledger,
    }
}

/// A completed gift/boost checkout, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCompletion {
    pub event_id: EventId,
    pub payer_user_id: UserId,
    pub session_id: CheckoutSessionId,
    pub purpose: PaymentPurpose,
    pub occurred_at_ms: i64,
}

/// What the writer must persist for a payment completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentWritePlan {
    /// Already handled. `ledger` is set when the event id is new but the
    /// session was completed by an earlier event, so retries of this id
    /// short-circuit on the ledger next time.
    Deduped { ledger: Option<ProcessedEvent> },
    /// Mark the session completed, update funding, record the event.
    Apply {
        session: PaymentSession,
        funding: FundingRecord,
        ledger: ProcessedEvent,
    },
}

impl PaymentWritePlan {
    pub fn outcome(&self) -> ApplyOutcome {
        match self {
            PaymentWritePlan::Deduped { .. } => ApplyOutcome::Deduped,
            PaymentWritePlan::Apply { .. } => ApplyOutcome::Applied,
        }
    }
}

/// Decides how a completed checkout changes the session and wish funding.
pub fn plan_payment_write(
    already_recorded: bool,
    session: Option<&PaymentSession>,
    funding: Option<&FundingRecord>,
    completion: &PaymentCompletion,
    boost_hours: i64,
    now: Timestamp,
) -> PaymentWritePlan {
    if already_recorded {
        return PaymentWritePlan::Deduped { ledger: None };
    }

    let ledger = ProcessedEvent {
        event_id: completion.event_id.clone(),
        provider: BillingProvider::Card,
        subject_user_id: completion.payer_user_id.clone(),
        kind: EventKind::PaymentCompleted,
        status: None,
        occurred_at_ms: completion.occurred_at_ms,
        stale: false,
        recorded_at: now,
    };

    if session.map_or(false, PaymentSession::is_completed) {
        return PaymentWritePlan::Deduped {
            ledger: Some(ledger),
        };
    }

    let mut funding = funding
        .cloned()
        .unwrap_or_else(|| FundingRecord::empty(completion.purpose.wish_id().clone(), now));
    match &completion.purpose {
        PaymentPurpose::Gift { amount, .. } => funding.add_gift(*amount, now),
        PaymentPurpose::Boost { .. } => funding.boost_until(now.plus_hours(boost_hours), now),
    }

    let session = PaymentSession {
        session_id: completion.session_id.clone(),
        payer_user_id: completion.payer_user_id.clone(),
        purpose: completion.purpose.clone(),
        status: PaymentSessionStatus::Completed,
        completed_at: Some(now),
    };

    PaymentWritePlan::Apply {
        session,
        funding,
        ledger,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::WishId;
    use proptest::prelude::*;

    fn update(id: &str, status: SubscriptionStatus, at: i64) -> SubscriptionUpdate {
        SubscriptionUpdate {
            event_id: EventId::new(id).unwrap(),
            provider: BillingProvider::Entitlement,
            user_id: UserId::new("u1").unwrap(),
            kind: if status == SubscriptionStatus::Canceled {
                EventKind::SubscriptionCanceled
            } else {
                EventKind::SubscriptionActivated
            },
            status,
            product_ref: Some("patron_monthly".to_string()),
            plan_key: Some("patron_monthly".to_string()),
            period_end: None,
            is_sandbox: false,
            occurred_at_ms: at,
        }
    }

    fn apply(current: Option<SubscriptionState>, upd: &SubscriptionUpdate) -> Option<SubscriptionState> {
        match plan_subscription_write(false, current.as_ref(), upd, Timestamp::now()) {
            SubscriptionWritePlan::Apply { state, .. } => Some(state),
            _ => current,
        }
    }

    fn gift(event: &str, session: &str, amount: i64) -> PaymentCompletion {
        PaymentCompletion {
            event_id: EventId::new(event).unwrap(),
            payer_user_id: UserId::new("payer").unwrap(),
            session_id: CheckoutSessionId::new(session).unwrap(),
            purpose: PaymentPurpose::Gift {
                wish_id: WishId::new("w1").unwrap(),
                amount,
            },
            occurred_at_ms: 1_000,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription planning
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn recorded_event_is_deduped() {
        let plan = plan_subscription_write(
            true,
            None,
            &update("e1", SubscriptionStatus::Active, 1_000),
            Timestamp::now(),
        );
        assert_eq!(plan, SubscriptionWritePlan::Deduped);
        assert_eq!(plan.outcome(), ApplyOutcome::Deduped);
    }

    #[test]
    fn first_event_is_applied_with_entitlement() {
        let plan = plan_subscription_write(
            false,
            None,
            &update("e1", SubscriptionStatus::Active, 1_000),
            Timestamp::now(),
        );

        match plan {
            SubscriptionWritePlan::Apply {
                state,
                entitlement,
                ledger,
            } => {
                assert_eq!(state.status, SubscriptionStatus::Active);
                assert_eq!(state.last_event_at_ms, 1_000);
                assert_eq!(state.plan_key.as_deref(), Some("patron_monthly"));
                assert!(entitlement.is_supporter);
                assert!(!ledger.stale);
            }
            other => panic!("expected apply, got {:?}", other),
        }
    }

    #[test]
    fn older_event_is_recorded_stale() {
        let current = apply(None, &update("e1", SubscriptionStatus::Active, 1_000)).unwrap();
        let plan = plan_subscription_write(
            false,
            Some(&current),
            &update("e2", SubscriptionStatus::Canceled, 500),
            Timestamp::now(),
        );

        match plan {
            SubscriptionWritePlan::RecordStale { ledger } => {
                assert!(ledger.stale);
                assert_eq!(ledger.event_id.as_str(), "e2");
            }
            other => panic!("expected stale, got {:?}", other),
        }
    }

    #[test]
    fn sandbox_event_applies_without_entitlement() {
        let mut upd = update("e1", SubscriptionStatus::Active, 1_000);
        upd.is_sandbox = true;

        match plan_subscription_write(false, None, &upd, Timestamp::now()) {
            SubscriptionWritePlan::Apply {
                state, entitlement, ..
            } => {
                assert_eq!(state.status, SubscriptionStatus::Active);
                assert!(state.is_sandbox);
                assert!(!entitlement.is_supporter);
            }
            other => panic!("expected apply, got {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn status_follows_newest_event_in_any_order(
            times in proptest::collection::hash_set(0i64..100_000, 1..30)
        ) {
            let mut times: Vec<i64> = times.into_iter().collect();
            // Newest first, so every later delivery is stale.
            times.sort_unstable_by(|a, b| b.cmp(a));
            let updates: Vec<SubscriptionUpdate> = times
                .iter()
                .enumerate()
                .map(|(i, &t)| {
                    let status = if t % 2 == 0 { SubscriptionStatus::Active } else { SubscriptionStatus::Canceled };
                    update(&format!("e{}", i), status, t)
                })
                .collect();

            let mut state: Option<SubscriptionState> = None;
            let mut last_seen = i64::MIN;
            for upd in &updates {
                state = apply(state, upd);
                let marker = state.as_ref().map(|s| s.last_event_at_ms).unwrap_or(i64::MIN);
                prop_assert!(marker >= last_seen);
                last_seen = marker;
            }

            let newest = updates.iter().max_by_key(|u| u.occurred_at_ms).unwrap();
            let state = state.unwrap();
            prop_assert_eq!(state.status, newest.status);
            prop_assert_eq!(state.last_event_at_ms, newest.occurred_at_ms);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Payment planning
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn gift_creates_funding_record() {
        let plan = plan_payment_write(false, None, None, &gift("evt_1", "s1", 30), 24, Timestamp::now());

        match plan {
            PaymentWritePlan::Apply {
                session, funding, ledger,
            } => {
                assert!(session.is_completed());
                assert_eq!(funding.funding_raised, 30);
                assert_eq!(funding.funding_supporters, 1);
                assert_eq!(ledger.kind, EventKind::PaymentCompleted);
            }
            other => panic!("expected apply, got {:?}", other),
        }
    }

    #[test]
    fn completed_session_is_deduped_but_recorded() {
        let now = Timestamp::now();
        let (session, funding) =
            match plan_payment_write(false, None, None, &gift("evt_1", "s1", 30), 24, now) {
                PaymentWritePlan::Apply { session, funding, .. } => (session, funding),
                other => panic!("expected apply, got {:?}", other),
            };

        let plan = plan_payment_write(
            false,
            Some(&session),
            Some(&funding),
            &gift("evt_2", "s1", 30),
            24,
            now,
        );

        match plan {
            PaymentWritePlan::Deduped { ledger: Some(ledger) } => {
                assert_eq!(ledger.event_id.as_str(), "evt_2");
            }
            other => panic!("expected deduped with ledger, got {:?}", other),
        }
    }

    #[test]
    fn recorded_payment_event_writes_nothing() {
        let plan = plan_payment_write(true, None, None, &gift("evt_1", "s1", 30), 24, Timestamp::now());
        assert_eq!(plan, PaymentWritePlan::Deduped { ledger: None });
    }

    #[test]
    fn boost_sets_window_from_processing_time() {
        let now = Timestamp::from_unix_secs(1_700_000_000).unwrap();
        let completion = PaymentCompletion {
            purpose: PaymentPurpose::Boost {
                wish_id: WishId::new("w1").unwrap(),
            },
            ..gift("evt_b", "s_boost", 0)
        };

        match plan_payment_write(false, None, None, &completion, 24, now) {
            PaymentWritePlan::Apply { funding, .. } => {
                assert_eq!(funding.boosted_until, Some(now.plus_hours(24)));
                assert_eq!(funding.funding_raised, 0);
                assert_eq!(funding.funding_supporters, 0);
            }
            other => panic!("expected apply, got {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn funding_counts_each_session_once(
            deliveries in proptest::collection::vec((0usize..5, 1i64..1_000, 0usize..8), 1..40)
        ) {
            use std::collections::{HashMap, HashSet};

            let now = Timestamp::now();
            let mut ledger: HashSet<String> = HashSet::new();
            let mut sessions: HashMap<String, PaymentSession> = HashMap::new();
            let mut funding: Option<FundingRecord> = None;
            let mut first_amounts: HashMap<String, i64> = HashMap::new();
            let mut last_raised = 0;

            for (session, amount, event) in deliveries {
                let session_id = format!("s{}", session);
                let event_id = format!("evt_{}", event);
                let completion = gift(&event_id, &session_id, amount);

                let plan = plan_payment_write(
                    ledger.contains(&event_id),
                    sessions.get(&session_id),
                    funding.as_ref(),
                    &completion,
                    24,
                    now,
                );
                match plan {
                    PaymentWritePlan::Apply { session, funding: updated, ledger: row } => {
                        first_amounts.entry(session_id.clone()).or_insert(amount);
                        sessions.insert(session_id, session);
                        funding = Some(updated);
                        ledger.insert(row.event_id.as_str().to_string());
                    }
                    PaymentWritePlan::Deduped { ledger: Some(row) } => {
                        ledger.insert(row.event_id.as_str().to_string());
                    }
                    PaymentWritePlan::Deduped { ledger: None } => {}
                }

                let raised = funding.as_ref().map_or(0, |f| f.funding_raised);
                prop_assert!(raised >= last_raised);
                last_raised = raised;
            }

            let funding = funding.unwrap();
            prop_assert_eq!(funding.funding_raised, first_amounts.values().sum::<i64>());
            prop_assert_eq!(funding.funding_supporters, first_amounts.len() as i64);
        }
    }

    #[test]
    fn pending_session_is_completed() {
        let pending = PaymentSession {
            session_id: CheckoutSessionId::new("s1").unwrap(),
            payer_user_id: UserId::new("payer").unwrap(),
            purpose: PaymentPurpose::Gift {
                wish_id: WishId::new("w1").unwrap(),
                amount: 30,
            },
            status: PaymentSessionStatus::Pending,
            completed_at: None,
        };

        let plan = plan_payment_write(
            false,
            Some(&pending),
            None,
            &gift("evt_1", "s1", 30),
            24,
            Timestamp::now(),
        );

        assert_eq!(plan.outcome(), ApplyOutcome::Applied);
    }
}
