//! PostgreSQL implementation of BillingReader.

use async_trait::async_trait;
use sqlx::PgPool;

use super::billing_rows::{EntitlementRow, FundingRow, ProcessedEventRow, SubscriptionRow};
use crate::domain::billing::{
    BillingProvider, FundingRecord, ProcessedEvent, SubscriptionState, UserEntitlement,
};
use crate::domain::foundation::{DomainError, EventId, UserId, WishId};
use crate::ports::BillingReader;

/// PostgreSQL implementation of the BillingReader port.
pub struct PostgresBillingReader {
    pool: PgPool,
}

impl PostgresBillingReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::database(format!("{}: {}", context, e))
}

#[async_trait]
impl BillingReader for PostgresBillingReader {
    async fn get_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionState>, DomainError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT user_id, status, provider, product_ref, plan_key, is_sandbox,
                   current_period_end, last_event_id, last_event_at_ms, updated_at
            FROM subscription_states
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch subscription"))?;

        match row {
            Some(row) => row.into_state(),
            None => Ok(None),
        }
    }

    async fn get_entitlement(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserEntitlement>, DomainError> {
        sqlx::query_as::<_, EntitlementRow>(
            "SELECT user_id, is_supporter, updated_at FROM user_entitlements WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch entitlement"))?
        .map(UserEntitlement::try_from)
        .transpose()
    }

    async fn get_funding(&self, wish_id: &WishId) -> Result<Option<FundingRecord>, DomainError> {
        sqlx::query_as::<_, FundingRow>(
            r#"
            SELECT wish_id, funding_raised, funding_supporters, boosted_until, updated_at
            FROM wish_funding
            WHERE wish_id = $1
            "#,
        )
        .bind(wish_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch wish funding"))?
        .map(FundingRecord::try_from)
        .transpose()
    }

    async fn find_processed_event(
        &self,
        provider: BillingProvider,
        event_id: &EventId,
    ) -> Result<Option<ProcessedEvent>, DomainError> {
        sqlx::query_as::<_, ProcessedEventRow>(
            r#"
            SELECT event_id, provider, subject_user_id, kind, status, occurred_at_ms, stale, recorded_at
            FROM processed_events
            WHERE provider = $1 AND event_id = $2
            "#,
        )
        .bind(provider.as_str())
        .bind(event_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch processed event"))?
        .map(ProcessedEvent::try_from)
        .transpose()
    }
}
