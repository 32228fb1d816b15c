//! Provider-neutral billing event vocabulary.
//!
//! Both webhook paths translate their payloads into [`NormalizedEvent`]
//! before anything else looks at them. Resolver, ordering guard and writer
//! only ever see this shape.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::BillingProvider;
use crate::domain::foundation::{
    CheckoutSessionId, EventId, Timestamp, UserId, ValidationError, WishId,
};

/// Internal event taxonomy shared by both providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SubscriptionActivated,
    SubscriptionRenewed,
    SubscriptionCanceled,
    SubscriptionBillingIssue,
    PaymentCompleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SubscriptionActivated => "subscription_activated",
            EventKind::SubscriptionRenewed => "subscription_renewed",
            EventKind::SubscriptionCanceled => "subscription_canceled",
            EventKind::SubscriptionBillingIssue => "subscription_billing_issue",
            EventKind::PaymentCompleted => "payment_completed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription_activated" => Ok(EventKind::SubscriptionActivated),
            "subscription_renewed" => Ok(EventKind::SubscriptionRenewed),
            "subscription_canceled" => Ok(EventKind::SubscriptionCanceled),
            "subscription_billing_issue" => Ok(EventKind::SubscriptionBillingIssue),
            "payment_completed" => Ok(EventKind::PaymentCompleted),
            other => Err(ValidationError::invalid_format(
                "kind",
                format!("unknown event kind '{}'", other),
            )),
        }
    }
}

/// Billing period type reported alongside subscription events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    #[default]
    Normal,
    Trial,
    Intro,
    Promotional,
}

impl PeriodType {
    /// Parses a provider period type, case-insensitively.
    ///
    /// Anything unrecognized is treated as a normal paid period.
    pub fn from_provider(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "trial" | "trialing" => PeriodType::Trial,
            "intro" => PeriodType::Intro,
            "promotional" => PeriodType::Promotional,
            _ => PeriodType::Normal,
        }
    }
}

/// What a completed card payment was for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentPurpose {
    /// One-time contribution toward a wish's funding total.
    Gift { wish_id: WishId, amount: i64 },
    /// Paid, time-limited visibility promotion of a wish.
    Boost { wish_id: WishId },
}

impl PaymentPurpose {
    pub fn wish_id(&self) -> &WishId {
        match self {
            PaymentPurpose::Gift { wish_id, .. } | PaymentPurpose::Boost { wish_id } => wish_id,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPurpose::Gift { .. } => "gift",
            PaymentPurpose::Boost { .. } => "boost",
        }
    }
}

/// Checkout session details carried by a payment-completed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetails {
    pub session_id: CheckoutSessionId,
    pub purpose: PaymentPurpose,
}

/// A provider event translated into the internal vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    /// Idempotency key, unique within the provider.
    pub event_id: EventId,
    pub provider: BillingProvider,
    pub subject_user_id: UserId,
    /// `None` when the provider type is not one we act on.
    pub kind: Option<EventKind>,
    /// Provider event type string, kept for logs and the ledger.
    pub raw_kind: String,
    /// Ordering key. Always present, see [`resolve_occurred_at_ms`].
    pub occurred_at_ms: i64,
    pub product_ref: Option<String>,
    pub period_end: Option<Timestamp>,
    pub period_type: PeriodType,
    pub transaction_ref: Option<String>,
    pub is_sandbox: bool,
    /// Present only for payment-completed card events.
    pub payment: Option<PaymentDetails>,
}

/// Picks the ordering key for an event.
///
/// Explicit event time wins, then the expiration time, then the time we
/// received the webhook.
pub fn resolve_occurred_at_ms(
    event_timestamp_ms: Option<i64>,
    expiration_ms: Option<i64>,
    received_at: Timestamp,
) -> i64 {
    event_timestamp_ms
        .or(expiration_ms)
        .unwrap_or_else(|| received_at.as_unix_millis())
}
