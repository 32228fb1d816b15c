//! PostgreSQL implementation of BillingStore.
//!
//! Each event is one transaction. Same-subject deliveries serialize on a
//! row lock (`SELECT ... FOR UPDATE` after inserting a placeholder row with
//! `ON CONFLICT DO NOTHING`); different users proceed in parallel. The
//! ledger primary key `(provider, event_id)` settles any race the lock does not cover: a ledger
//! insert that returns no row means another transaction won, and this one
//! rolls back as `Deduped`.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::billing_rows::{purpose_amount, FundingRow, PaymentSessionRow, SubscriptionRow};
use crate::domain::billing::{
    plan_payment_write, plan_subscription_write, ApplyOutcome, BillingProvider, FundingRecord,
    PaymentCompletion, PaymentSession, PaymentWritePlan, ProcessedEvent, SubscriptionState, SubscriptionUpdate,
    SubscriptionWritePlan, UserEntitlement,
};
use crate::domain::foundation::{DomainError, EventId, Timestamp};
use crate::ports::BillingStore;

/// PostgreSQL implementation of the BillingStore port.
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type Tx = Transaction<'static, Postgres>;

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::database(format!("{}: {}", context, e))
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn apply_subscription_event(
        &self,
        update: &SubscriptionUpdate,
    ) -> Result<ApplyOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO subscription_states (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(update.user_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to create subscription row"))?;

        let current = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT user_id, status, provider, product_ref, plan_key, is_sandbox,
                   current_period_end, last_event_id, last_event_at_ms, updated_at
            FROM subscription_states
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(update.user_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to lock subscription row"))?
        .into_state()?;

        let already_recorded = ledger_contains(&mut tx, update.provider, &update.event_id).await?;
        let plan = plan_subscription_write(
            already_recorded,
            current.as_ref(),
            update,
            Timestamp::now(),
        );

        match plan {
            SubscriptionWritePlan::Deduped => {
                rollback(tx).await?;
                Ok(ApplyOutcome::Deduped)
            }
            SubscriptionWritePlan::RecordStale { ledger } => {
                if !insert_ledger(&mut tx, &ledger).await? {
                    rollback(tx).await?;
                    return Ok(ApplyOutcome::Deduped);
                }
                commit(tx).await?;
                Ok(ApplyOutcome::Stale)
            }
            SubscriptionWritePlan::Apply {
                state,
                entitlement,
                ledger,
            } => {
                if !insert_ledger(&mut tx, &ledger).await? {
                    rollback(tx).await?;
                    return Ok(ApplyOutcome::Deduped);
                }
                write_subscription(&mut tx, &state).await?;
                write_entitlement(&mut tx, &entitlement).await?;
                commit(tx).await?;
                Ok(ApplyOutcome::Applied)
            }
        }
    }

    async fn apply_payment_completion(
        &self,
        completion: &PaymentCompletion,
        boost_hours: i64,
    ) -> Result<ApplyOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let wish_id = completion.purpose.wish_id();

        sqlx::query(
            r#"
            INSERT INTO payment_sessions (session_id, payer_user_id, purpose, wish_id, amount, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(completion.session_id.as_str())
        .bind(completion.payer_user_id.as_str())
        .bind(completion.purpose.as_str())
        .bind(wish_id.as_str())
        .bind(purpose_amount(&completion.purpose))
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to create payment session"))?;

        let session = PaymentSession::try_from(
            sqlx::query_as::<_, PaymentSessionRow>(
                r#"
                SELECT session_id, payer_user_id, purpose, wish_id, amount, status, completed_at
                FROM payment_sessions
                WHERE session_id = $1
                FOR UPDATE
                "#,
            )
            .bind(completion.session_id.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to lock payment session"))?,
        )?;

        let already_recorded = ledger_contains(&mut tx, BillingProvider::Card, &completion.event_id).await?;
        if already_recorded || session.is_completed() {
            // Skip the funding lock; the plan only needs the ledger and session.
            let plan = plan_payment_write(
                already_recorded,
                Some(&session),
                None,
                completion,
                boost_hours,
                Timestamp::now(),
            );
            return finish_payment_dedup(tx, plan).await;
        }

        sqlx::query(
            r#"
            INSERT INTO wish_funding (wish_id)
            VALUES ($1)
            ON CONFLICT (wish_id) DO NOTHING
            "#,
        )
        .bind(wish_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to create funding row"))?;

        let funding = FundingRecord::try_from(
            sqlx::query_as::<_, FundingRow>(
                r#"
                SELECT wish_id, funding_raised, funding_supporters, boosted_until, updated_at
                FROM wish_funding
                WHERE wish_id = $1
                FOR UPDATE
                "#,
            )
            .bind(wish_id.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to lock funding row"))?,
        )?;

        let plan = plan_payment_write(
            false,
            Some(&session),
            Some(&funding),
            completion,
            boost_hours,
            Timestamp::now(),
        );

        match plan {
            PaymentWritePlan::Apply {
                session,
                funding,
                ledger,
            } => {
                if !insert_ledger(&mut tx, &ledger).await? {
                    rollback(tx).await?;
                    return Ok(ApplyOutcome::Deduped);
                }
                complete_session(&mut tx, &session).await?;
                write_funding(&mut tx, &funding).await?;
                commit(tx).await?;
                Ok(ApplyOutcome::Applied)
            }
            dedup => finish_payment_dedup(tx, dedup).await,
        }
    }
}

async fn finish_payment_dedup(
    mut tx: Tx,
    plan: PaymentWritePlan,
) -> Result<ApplyOutcome, DomainError> {
    match plan {
        PaymentWritePlan::Deduped {
            ledger: Some(ledger),
        } => {
            if insert_ledger(&mut tx, &ledger).await? {
                commit(tx).await?;
            } else {
                rollback(tx).await?;
            }
        }
        _ => rollback(tx).await?,
    }
    Ok(ApplyOutcome::Deduped)
}

async fn ledger_contains(
    tx: &mut Tx,
    provider: BillingProvider,
    event_id: &EventId,
) -> Result<bool, DomainError> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT event_id FROM processed_events WHERE provider = $1 AND event_id = $2",
    )
    .bind(provider.as_str())
    .bind(event_id.as_str())
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_error("Failed to check processed event"))?;
    Ok(row.is_some())
}

/// Inserts a ledger row. Returns false when the provider already has a row
/// for this event id.
async fn insert_ledger(tx: &mut Tx, event: &ProcessedEvent) -> Result<bool, DomainError> {
    let row: Option<(String,)> = sqlx::query_as(
        r#"
        INSERT INTO processed_events
            (event_id, provider, subject_user_id, kind, status, occurred_at_ms, stale, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (provider, event_id) DO NOTHING
        RETURNING event_id
        "#,
    )
    .bind(event.event_id.as_str())
    .bind(event.provider.as_str())
    .bind(event.subject_user_id.as_str())
    .bind(event.kind.as_str())
    .bind(event.status.map(|s| s.as_str()))
    .bind(event.occurred_at_ms)
    .bind(event.stale)
    .bind(*event.recorded_at.as_datetime())
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_error("Failed to record processed event"))?;
    Ok(row.is_some())
}

async fn write_subscription(tx: &mut Tx, state: &SubscriptionState) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE subscription_states SET
            status = $2,
            provider = $3,
            product_ref = $4,
            plan_key = $5,
            is_sandbox = $6,
            current_period_end = $7,
            last_event_id = $8,
            last_event_at_ms = $9,
            updated_at = $10
        WHERE user_id = $1
        "#,
    )
    .bind(state.user_id.as_str())
    .bind(state.status.as_str())
    .bind(state.provider.as_str())
    .bind(state.product_ref.as_deref())
    .bind(state.plan_key.as_deref())
    .bind(state.is_sandbox)
    .bind(state.current_period_end.map(|t| *t.as_datetime()))
    .bind(state.last_event_id.as_str())
    .bind(state.last_event_at_ms)
    .bind(*state.updated_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to update subscription state"))?;
    Ok(())
}

async fn write_entitlement(tx: &mut Tx, entitlement: &UserEntitlement) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO user_entitlements (user_id, is_supporter, updated_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE SET
            is_supporter = EXCLUDED.is_supporter,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(entitlement.user_id.as_str())
    .bind(entitlement.is_supporter)
    .bind(*entitlement.updated_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to update entitlement"))?;
    Ok(())
}

async fn complete_session(tx: &mut Tx, session: &PaymentSession) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE payment_sessions SET
            status = $2,
            completed_at = $3
        WHERE session_id = $1
        "#,
    )
    .bind(session.session_id.as_str())
    .bind(session.status.as_str())
    .bind(session.completed_at.map(|t| *t.as_datetime()))
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to complete payment session"))?;
    Ok(())
}

async fn write_funding(tx: &mut Tx, funding: &FundingRecord) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE wish_funding SET
            funding_raised = $2,
            funding_supporters = $3,
            boosted_until = $4,
            updated_at = $5
        WHERE wish_id = $1
        "#,
    )
    .bind(funding.wish_id.as_str())
    .bind(funding.funding_raised)
    .bind(funding.funding_supporters)
    .bind(funding.boosted_until.map(|t| *t.as_datetime()))
    .bind(*funding.updated_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to update wish funding"))?;
    Ok(())
}

async fn commit(tx: Tx) -> Result<(), DomainError> {
    tx.commit()
        .await
        .map_err(db_error("Failed to commit transaction"))
}

async fn rollback(tx: Tx) -> Result<(), DomainError> {
    tx.rollback()
        .await
        .map_err(db_error("Failed to roll back transaction"))
}
