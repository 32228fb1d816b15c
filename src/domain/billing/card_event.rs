//! Card gateway webhook events.
//!
//! Captures only the envelope fields we need; the event object is kept as
//! raw JSON and picked apart by [`normalize_card_event`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    resolve_occurred_at_ms, BillingProvider, EventKind, NormalizedEvent, PaymentDetails,
    PaymentPurpose, PeriodType, WebhookError,
};
use crate::domain::foundation::{CheckoutSessionId, EventId, Timestamp, UserId, WishId};

/// Card gateway webhook event (simplified).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CardEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix seconds).
    pub created: i64,

    pub data: CardEventData,

    /// False for test-mode events.
    #[serde(default)]
    pub livemode: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CardEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: Value,

    /// Previous values for updated attributes (only for update events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<Value>,
}

impl CardEvent {
    pub fn parsed_type(&self) -> CardEventType {
        CardEventType::parse(&self.event_type)
    }
}

/// Card event types we act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardEventType {
    CheckoutSessionCompleted,
    CheckoutSessionAsyncPaymentSucceeded,
    CustomerSubscriptionCreated,
    CustomerSubscriptionUpdated,
    CustomerSubscriptionDeleted,
    InvoicePaid,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    Unknown,
}

impl CardEventType {
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "checkout.session.async_payment_succeeded" => {
                Self::CheckoutSessionAsyncPaymentSucceeded
            }
            "customer.subscription.created" => Self::CustomerSubscriptionCreated,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            "invoice.paid" => Self::InvoicePaid,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CheckoutSessionAsyncPaymentSucceeded => {
                "checkout.session.async_payment_succeeded"
            }
            Self::CustomerSubscriptionCreated => "customer.subscription.created",
            Self::CustomerSubscriptionUpdated => "customer.subscription.updated",
            Self::CustomerSubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaid => "invoice.paid",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unknown => "unknown",
        }
    }
}

/// Translates a verified card event into the internal vocabulary.
///
/// Event types we do not act on, unsettled payments and checkouts with no
/// gift/boost purpose come back as [`WebhookError::Ignored`].
pub fn normalize_card_event(
    event: &CardEvent,
    received_at: Timestamp,
) -> Result<NormalizedEvent, WebhookError> {
    let object = &event.data.object;

    let (kind, payment, period_type) = match event.parsed_type() {
        CardEventType::CheckoutSessionCompleted
        | CardEventType::CheckoutSessionAsyncPaymentSucceeded => {
            match str_at(object, &["mode"]) {
                Some("payment") => {
                    let payment = checkout_payment(object)?;
                    (EventKind::PaymentCompleted, Some(payment), PeriodType::Normal)
                }
                Some("subscription") => (
                    EventKind::SubscriptionActivated,
                    None,
                    PeriodType::Normal,
                ),
                other => {
                    return Err(WebhookError::Ignored(format!(
                        "checkout mode {:?}",
                        other.unwrap_or("none")
                    )))
                }
            }
        }
        CardEventType::CustomerSubscriptionCreated => (
            subscription_kind(object, EventKind::SubscriptionActivated)?,
            None,
            subscription_period_type(object),
        ),
        CardEventType::CustomerSubscriptionUpdated => (
            subscription_kind(object, EventKind::SubscriptionRenewed)?,
            None,
            subscription_period_type(object),
        ),
        CardEventType::CustomerSubscriptionDeleted => {
            (EventKind::SubscriptionCanceled, None, PeriodType::Normal)
        }
        CardEventType::InvoicePaid | CardEventType::InvoicePaymentSucceeded => {
            (EventKind::SubscriptionRenewed, None, PeriodType::Normal)
        }
        CardEventType::InvoicePaymentFailed => {
            (EventKind::SubscriptionBillingIssue, None, PeriodType::Normal)
        }
        CardEventType::Unknown => {
            return Err(WebhookError::Ignored(format!(
                "unhandled event type {}",
                event.event_type
            )))
        }
    };

    let event_id = EventId::new(event.id.as_str()).map_err(|_| WebhookError::MissingField("id"))?;
    let subject = card_subject(object).ok_or(WebhookError::MissingField("metadata.user_id"))?;
    let subject_user_id =
        UserId::new(subject).map_err(|_| WebhookError::MissingField("metadata.user_id"))?;

    let created_ms = event
        .created
        .checked_mul(1000)
        .ok_or(WebhookError::InvalidTimestamp)?;

    Ok(NormalizedEvent {
        event_id,
        provider: BillingProvider::Card,
        subject_user_id,
        kind: Some(kind),
        raw_kind: event.event_type.clone(),
        occurred_at_ms: resolve_occurred_at_ms(Some(created_ms), None, received_at),
        product_ref: product_ref(object),
        period_end: period_end(object),
        period_type,
        transaction_ref: transaction_ref(object),
        is_sandbox: !event.livemode,
        payment,
    })
}

/// Gift/boost details from a payment-mode checkout session.
fn checkout_payment(object: &Value) -> Result<PaymentDetails, WebhookError> {
    if let Some(status) = str_at(object, &["payment_status"]) {
        if status != "paid" && status != "no_payment_required" {
            return Err(WebhookError::Ignored(format!("payment status '{}'", status)));
        }
    }

    let purpose = str_at(object, &["metadata", "purpose"])
        .ok_or_else(|| WebhookError::Ignored("checkout has no purpose".to_string()))?;

    let wish_id = str_at(object, &["metadata", "wish_id"])
        .and_then(|w| WishId::new(w).ok())
        .ok_or(WebhookError::MissingField("metadata.wish_id"))?;

    let purpose = match purpose {
        "gift" => {
            let amount = object
                .get("amount_total")
                .and_then(Value::as_i64)
                .or_else(|| {
                    str_at(object, &["metadata", "amount"]).and_then(|a| a.parse::<i64>().ok())
                })
                .ok_or(WebhookError::MissingField("amount_total"))?;
            if amount <= 0 {
                return Err(WebhookError::ParseError(format!(
                    "gift amount must be positive, got {}",
                    amount
                )));
            }
            PaymentPurpose::Gift { wish_id, amount }
        }
        "boost" => PaymentPurpose::Boost { wish_id },
        other => {
            return Err(WebhookError::Ignored(format!(
                "checkout purpose '{}'",
                other
            )))
        }
    };

    let session_id = str_at(object, &["id"])
        .and_then(|id| CheckoutSessionId::new(id).ok())
        .ok_or(WebhookError::MissingField("data.object.id"))?;

    Ok(PaymentDetails {
        session_id,
        purpose,
    })
}

fn card_subject(object: &Value) -> Option<&str> {
    str_at(object, &["metadata", "user_id"])
        .or_else(|| str_at(object, &["client_reference_id"]))
        .or_else(|| str_at(object, &["subscription_details", "metadata", "user_id"]))
}

/// Event kind for a subscription object, keyed on its `status`.
///
/// Only a paid-up status yields `paid_kind`. Statuses that say nothing
/// settled yet (`incomplete`, `paused`, absent) are ignored.
fn subscription_kind(object: &Value, paid_kind: EventKind) -> Result<EventKind, WebhookError> {
    match str_at(object, &["status"]).unwrap_or_default() {
        "active" | "trialing" => Ok(paid_kind),
        "past_due" | "unpaid" => Ok(EventKind::SubscriptionBillingIssue),
        "canceled" | "incomplete_expired" => Ok(EventKind::SubscriptionCanceled),
        other => Err(WebhookError::Ignored(format!(
            "subscription status '{}'",
            other
        ))),
    }
}

fn subscription_period_type(object: &Value) -> PeriodType {
    match str_at(object, &["status"]) {
        Some("trialing") => PeriodType::Trial,
        _ => PeriodType::Normal,
    }
}

/// Product of the first subscription item or invoice line.
fn product_ref(object: &Value) -> Option<String> {
    let first_item = object
        .pointer("/items/data/0")
        .or_else(|| object.pointer("/lines/data/0"))?;
    str_at(first_item, &["price", "product"])
        .or_else(|| str_at(first_item, &["price", "id"]))
        .map(str::to_string)
}

fn period_end(object: &Value) -> Option<Timestamp> {
    object
        .get("current_period_end")
        .and_then(Value::as_i64)
        .or_else(|| object.pointer("/lines/data/0/period/end").and_then(Value::as_i64))
        .and_then(Timestamp::from_unix_secs)
}

fn transaction_ref(object: &Value) -> Option<String> {
    str_at(object, &["payment_intent"])
        .or_else(|| str_at(object, &["subscription"]))
        .or_else(|| str_at(object, &["id"]))
        .map(str::to_string)
}

/// Non-blank string at a nested object path.
fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Builder for creating test CardEvent instances.
#[cfg(test)]
pub struct CardEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: Value,
    livemode: bool,
}

#[cfg(test)]
impl Default for CardEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
            livemode: true,
        }
    }
}

#[cfg(test)]
impl CardEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    pub fn object(mut self, object: Value) -> Self {
        self.object = object;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn build(self) -> CardEvent {
        CardEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: CardEventData {
                object: self.object,
                previous_attributes: None,
            },
            livemode: self.livemode,
            api_version: Some("2023-10-16".to_string()),
        }
    }
}
