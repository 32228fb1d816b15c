//! Per-user subscription read model.

use serde::{Deserialize, Serialize};

use super::{BillingProvider, SubscriptionStatus};
use crate::domain::foundation::{EventId, Timestamp, UserId};

/// Subscription state for a single user.
///
/// Created lazily by the first applied event and only ever transitioned
/// afterwards. `last_event_at_ms` never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionState {
    pub user_id: UserId,
    pub status: SubscriptionStatus,
    pub provider: BillingProvider,
    pub product_ref: Option<String>,
    pub plan_key: Option<String>,
    pub is_sandbox: bool,
    pub current_period_end: Option<Timestamp>,
    pub last_event_id: EventId,
    pub last_event_at_ms: i64,
    pub updated_at: Timestamp,
}

impl SubscriptionState {
    /// Whether this state unlocks supporter perks in production.
    pub fn is_entitled(&self) -> bool {
        super::entitlement_for(self.status, self.is_sandbox)
    }
}

/// Derived entitlement flag written onto the user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntitlement {
    pub user_id: UserId,
    pub is_supporter: bool,
    pub updated_at: Timestamp,
}
