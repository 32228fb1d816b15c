//! Wish funding read model and the payment sessions that feed it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::PaymentPurpose;
use crate::domain::foundation::{CheckoutSessionId, Timestamp, UserId, ValidationError, WishId};

/// Funding totals for one wish.
///
/// Only completed gift/boost checkout sessions touch this record, each at
/// most once. No field ever decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingRecord {
    pub wish_id: WishId,
    pub funding_raised: i64,
    pub funding_supporters: i64,
    pub boosted_until: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl FundingRecord {
    /// An empty record for a wish that has not been funded yet.
    pub fn empty(wish_id: WishId, now: Timestamp) -> Self {
        Self {
            wish_id,
            funding_raised: 0,
            funding_supporters: 0,
            boosted_until: None,
            updated_at: now,
        }
    }

    /// Adds a completed gift. `amount` is positive; the card normalizer
    /// rejects anything else.
    pub fn add_gift(&mut self, amount: i64, now: Timestamp) {
        debug_assert!(amount > 0, "gift amount must be positive");
        self.funding_raised = self.funding_raised.saturating_add(amount);
        self.funding_supporters = self.funding_supporters.saturating_add(1);
        self.updated_at = now;
    }

    /// Extends the boost window to at least `until`.
    pub fn boost_until(&mut self, until: Timestamp, now: Timestamp) {
        self.boosted_until = Some(match self.boosted_until {
            Some(existing) if existing.is_after(&until) => existing,
            _ => until,
        });
        self.updated_at = now;
    }

    /// Whether the wish is currently promoted.
    pub fn is_boosted(&self, now: Timestamp) -> bool {
        self.boosted_until.map_or(false, |until| until.is_after(&now))
    }
}

/// Lifecycle of a gift/boost checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSessionStatus {
    Pending,
    Completed,
}

impl PaymentSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentSessionStatus::Pending => "pending",
            PaymentSessionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for PaymentSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentSessionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentSessionStatus::Pending),
            "completed" => Ok(PaymentSessionStatus::Completed),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown payment session status '{}'", other),
            )),
        }
    }
}

/// A gift or boost checkout session.
///
/// Sessions are normally created as `pending` by the checkout builder; the
/// webhook marks them `completed`. A session the webhook has never seen is
/// treated as pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub session_id: CheckoutSessionId,
    pub payer_user_id: UserId,
    pub purpose: PaymentPurpose,
    pub status: PaymentSessionStatus,
    pub completed_at: Option<Timestamp>,
}

impl PaymentSession {
    pub fn is_completed(&self) -> bool {
        self.status == PaymentSessionStatus::Completed
    }
}
