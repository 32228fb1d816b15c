//! Entitlement provider webhook payloads.
//!
//! The provider posts either a bare event object or one wrapped as
//! `{"api_version": "...", "event": {...}}`. Both are accepted.

use serde::Deserialize;

use super::{resolve_occurred_at_ms, BillingProvider, EventKind, NormalizedEvent, PeriodType, WebhookError};
use crate::domain::foundation::{EventId, Timestamp, UserId};

/// Fields of an entitlement event we read. Everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitlementEvent {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub event_id: Option<String>,
    pub id: Option<String>,
    pub transaction_id: Option<String>,
    pub app_user_id: Option<String>,
    pub product_id: Option<String>,
    pub product_identifier: Option<String>,
    pub event_timestamp_ms: Option<i64>,
    pub expiration_at_ms: Option<i64>,
    pub period_type: Option<String>,
    pub environment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntitlementWebhookBody {
    Wrapped { event: EntitlementEvent },
    Flat(EntitlementEvent),
}

impl EntitlementEvent {
    /// Parses a raw webhook body, unwrapping the `event` envelope if present.
    pub fn from_slice(body: &[u8]) -> Result<Self, WebhookError> {
        let body: EntitlementWebhookBody = serde_json::from_slice(body)?;
        Ok(match body {
            EntitlementWebhookBody::Wrapped { event } => event,
            EntitlementWebhookBody::Flat(event) => event,
        })
    }

    fn resolved_event_id(&self) -> Option<&str> {
        non_blank(&self.event_id)
            .or_else(|| non_blank(&self.id))
            .or_else(|| non_blank(&self.transaction_id))
    }

    fn resolved_product(&self) -> Option<&str> {
        non_blank(&self.product_id).or_else(|| non_blank(&self.product_identifier))
    }

    fn is_sandbox(&self) -> bool {
        self.environment
            .as_deref()
            .map_or(false, |env| env.eq_ignore_ascii_case("SANDBOX"))
    }
}

/// Maps a provider event type to the internal kind.
pub fn entitlement_kind(raw: &str) -> Option<EventKind> {
    match raw {
        "INITIAL_PURCHASE" | "UNCANCELLATION" | "TEMPORARY_ENTITLEMENT_GRANT" => {
            Some(EventKind::SubscriptionActivated)
        }
        "RENEWAL" | "PRODUCT_CHANGE" | "SUBSCRIPTION_EXTENDED" => {
            Some(EventKind::SubscriptionRenewed)
        }
        "CANCELLATION" | "EXPIRATION" => Some(EventKind::SubscriptionCanceled),
        "BILLING_ISSUE" => Some(EventKind::SubscriptionBillingIssue),
        _ => None,
    }
}

/// Translates an entitlement event into the internal vocabulary.
///
/// Unrecognized types normalize with `kind: None`; the caller acknowledges
/// them without writing anything.
pub fn normalize_entitlement_event(
    event: &EntitlementEvent,
    received_at: Timestamp,
) -> Result<NormalizedEvent, WebhookError> {
    let event_id = event
        .resolved_event_id()
        .and_then(|id| EventId::new(id).ok())
        .ok_or(WebhookError::MissingField("event_id"))?;

    let subject_user_id = non_blank(&event.app_user_id)
        .and_then(|id| UserId::new(id).ok())
        .ok_or(WebhookError::MissingField("app_user_id"))?;

    let raw_kind = non_blank(&event.event_type)
        .ok_or(WebhookError::MissingField("type"))?
        .to_string();

    Ok(NormalizedEvent {
        event_id,
        provider: BillingProvider::Entitlement,
        subject_user_id,
        kind: entitlement_kind(&raw_kind),
        occurred_at_ms: resolve_occurred_at_ms(
            event.event_timestamp_ms,
            event.expiration_at_ms,
            received_at,
        ),
        raw_kind,
        product_ref: event.resolved_product().map(str::to_string),
        period_end: event.expiration_at_ms.and_then(Timestamp::from_unix_millis),
        period_type: event
            .period_type
            .as_deref()
            .map(PeriodType::from_provider)
            .unwrap_or_default(),
        transaction_ref: non_blank(&event.transaction_id).map(str::to_string),
        is_sandbox: event.is_sandbox(),
        payment: None,
    })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
