//! BillingReader port (read side / CQRS queries).
//!
//! Consumers outside the webhook path (profile screens, wish listings,
//! support tooling) read reconciled state through this port only.

use async_trait::async_trait;

use crate::domain::billing::{
    BillingProvider, FundingRecord, ProcessedEvent, SubscriptionState, UserEntitlement,
};
use crate::domain::foundation::{DomainError, EventId, UserId, WishId};

/// Reader port for reconciled billing state.
#[async_trait]
pub trait BillingReader: Send + Sync {
    /// Subscription state for a user, `None` if no event was ever applied.
    async fn get_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionState>, DomainError>;

    /// Derived supporter flag for a user.
    async fn get_entitlement(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserEntitlement>, DomainError>;

    /// Funding totals for a wish, `None` if never funded or boosted.
    async fn get_funding(&self, wish_id: &WishId) -> Result<Option<FundingRecord>, DomainError>;

    /// Ledger row for an event id. Ids are scoped to the provider that sent them.
    async fn find_processed_event(
        &self,
        provider: BillingProvider,
        event_id: &EventId,
    ) -> Result<Option<ProcessedEvent>, DomainError>;
}
