//! Row types shared by the billing store and reader.

use chrono::{DateTime, Utc};

use crate::domain::billing::{
    BillingProvider, EventKind, FundingRecord, PaymentPurpose, PaymentSession,
    PaymentSessionStatus, ProcessedEvent, SubscriptionState, SubscriptionStatus, UserEntitlement,
};
use crate::domain::foundation::{
    CheckoutSessionId, DomainError, ErrorCode, EventId, Timestamp, UserId, WishId,
};

/// Database row of `subscription_states`.
///
/// A row with no `last_event_id` is the placeholder inserted to take a row
/// lock before the first event for the user is applied.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct SubscriptionRow {
    pub user_id: String,
    pub status: String,
    pub provider: Option<String>,
    pub product_ref: Option<String>,
    pub plan_key: Option<String>,
    pub is_sandbox: bool,
    pub current_period_end: Option<DateTime<Utc>>,
    pub last_event_id: Option<String>,
    pub last_event_at_ms: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    pub fn into_state(self) -> Result<Option<SubscriptionState>, DomainError> {
        let (Some(last_event_id), Some(last_event_at_ms), Some(provider)) =
            (self.last_event_id, self.last_event_at_ms, self.provider)
        else {
            return Ok(None);
        };

        Ok(Some(SubscriptionState {
            user_id: UserId::new(self.user_id).map_err(invalid("user_id"))?,
            status: self.status.parse::<SubscriptionStatus>().map_err(invalid("status"))?,
            provider: provider.parse::<BillingProvider>().map_err(invalid("provider"))?,
            product_ref: self.product_ref,
            plan_key: self.plan_key,
            is_sandbox: self.is_sandbox,
            current_period_end: self.current_period_end.map(Timestamp::from_datetime),
            last_event_id: EventId::new(last_event_id).map_err(invalid("last_event_id"))?,
            last_event_at_ms,
            updated_at: Timestamp::from_datetime(self.updated_at),
        }))
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct EntitlementRow {
    pub user_id: String,
    pub is_supporter: bool,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EntitlementRow> for UserEntitlement {
    type Error = DomainError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        Ok(UserEntitlement {
            user_id: UserId::new(row.user_id).map_err(invalid("user_id"))?,
            is_supporter: row.is_supporter,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProcessedEventRow {
    pub event_id: String,
    pub provider: String,
    pub subject_user_id: String,
    pub kind: String,
    pub status: Option<String>,
    pub occurred_at_ms: i64,
    pub stale: bool,
    pub recorded_at: DateTime<Utc>,
}

impl TryFrom<ProcessedEventRow> for ProcessedEvent {
    type Error = DomainError;

    fn try_from(row: ProcessedEventRow) -> Result<Self, Self::Error> {
        Ok(ProcessedEvent {
            event_id: EventId::new(row.event_id).map_err(invalid("event_id"))?,
            provider: row.provider.parse::<BillingProvider>().map_err(invalid("provider"))?,
            subject_user_id: UserId::new(row.subject_user_id)
                .map_err(invalid("subject_user_id"))?,
            kind: row.kind.parse::<EventKind>().map_err(invalid("kind"))?,
            status: row
                .status
                .map(|s| s.parse::<SubscriptionStatus>())
                .transpose()
                .map_err(invalid("status"))?,
            occurred_at_ms: row.occurred_at_ms,
            stale: row.stale,
            recorded_at: Timestamp::from_datetime(row.recorded_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct PaymentSessionRow {
    pub session_id: String,
    pub payer_user_id: String,
    pub purpose: String,
    pub wish_id: String,
    pub amount: Option<i64>,
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentSessionRow> for PaymentSession {
    type Error = DomainError;

    fn try_from(row: PaymentSessionRow) -> Result<Self, Self::Error> {
        let wish_id = WishId::new(row.wish_id).map_err(invalid("wish_id"))?;
        let purpose = match row.purpose.as_str() {
            "gift" => PaymentPurpose::Gift {
                wish_id,
                amount: row.amount.unwrap_or(0),
            },
            "boost" => PaymentPurpose::Boost { wish_id },
            other => {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid purpose value: {}", other),
                ))
            }
        };

        Ok(PaymentSession {
            session_id: CheckoutSessionId::new(row.session_id).map_err(invalid("session_id"))?,
            payer_user_id: UserId::new(row.payer_user_id).map_err(invalid("payer_user_id"))?,
            purpose,
            status: row.status.parse::<PaymentSessionStatus>().map_err(invalid("status"))?,
            completed_at: row.completed_at.map(Timestamp::from_datetime),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct FundingRow {
    pub wish_id: String,
    pub funding_raised: i64,
    pub funding_supporters: i64,
    pub boosted_until: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<FundingRow> for FundingRecord {
    type Error = DomainError;

    fn try_from(row: FundingRow) -> Result<Self, Self::Error> {
        Ok(FundingRecord {
            wish_id: WishId::new(row.wish_id).map_err(invalid("wish_id"))?,
            funding_raised: row.funding_raised,
            funding_supporters: row.funding_supporters,
            boosted_until: row.boosted_until.map(Timestamp::from_datetime),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Gift amount column value for a purpose.
pub(super) fn purpose_amount(purpose: &PaymentPurpose) -> Option<i64> {
    match purpose {
        PaymentPurpose::Gift { amount, .. } => Some(*amount),
        PaymentPurpose::Boost { .. } => None,
    }
}

fn invalid<E: std::fmt::Display>(column: &'static str) -> impl Fn(E) -> DomainError {
    move |e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value: {}", column, e),
        )
    }
}
