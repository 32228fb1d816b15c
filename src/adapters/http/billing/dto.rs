//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! Webhook bodies are read raw for signature verification, so only response
//! types live here.

use serde::Serialize;

use crate::domain::billing::{
    ApplyOutcome, FundingRecord, ProcessedEvent, SubscriptionState, SubscriptionStatus,
};
use crate::domain::foundation::Timestamp;

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement returned to the provider for every accepted delivery.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub outcome: ApplyOutcome,
}

impl From<ApplyOutcome> for WebhookAckResponse {
    fn from(outcome: ApplyOutcome) -> Self {
        Self { outcome }
    }
}

/// Subscription read model for a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub user_id: String,
    pub status: SubscriptionStatus,
    pub provider: String,
    pub plan_key: Option<String>,
    pub product_ref: Option<String>,
    pub current_period_end: Option<Timestamp>,
    pub is_sandbox: bool,
    /// Whether supporter perks are unlocked.
    pub entitlement: bool,
    pub last_event_id: String,
    pub last_event_at_ms: i64,
    pub updated_at: Timestamp,
}

impl From<SubscriptionState> for SubscriptionResponse {
    fn from(state: SubscriptionState) -> Self {
        let entitlement = state.is_entitled();
        Self {
            user_id: state.user_id.to_string(),
            status: state.status,
            provider: state.provider.as_str().to_string(),
            plan_key: state.plan_key,
            product_ref: state.product_ref,
            current_period_end: state.current_period_end,
            is_sandbox: state.is_sandbox,
            entitlement,
            last_event_id: state.last_event_id.to_string(),
            last_event_at_ms: state.last_event_at_ms,
            updated_at: state.updated_at,
        }
    }
}

/// Funding totals for a wish.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingResponse {
    pub wish_id: String,
    pub funding_raised: i64,
    pub funding_supporters: i64,
    pub boosted_until: Option<Timestamp>,
    pub is_boosted: bool,
    pub updated_at: Timestamp,
}

impl FundingResponse {
    pub fn from_record(record: FundingRecord, now: Timestamp) -> Self {
        Self {
            is_boosted: record.is_boosted(now),
            wish_id: record.wish_id.to_string(),
            funding_raised: record.funding_raised,
            funding_supporters: record.funding_supporters,
            boosted_until: record.boosted_until,
            updated_at: record.updated_at,
        }
    }
}

/// Ledger row, exposed for auditing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedEventResponse {
    pub event_id: String,
    pub provider: String,
    pub subject_user_id: String,
    pub kind: String,
    pub status: Option<SubscriptionStatus>,
    pub occurred_at_ms: i64,
    pub stale: bool,
    pub recorded_at: Timestamp,
}

impl From<ProcessedEvent> for ProcessedEventResponse {
    fn from(event: ProcessedEvent) -> Self {
        Self {
            event_id: event.event_id.to_string(),
            provider: event.provider.as_str().to_string(),
            subject_user_id: event.subject_user_id.to_string(),
            kind: event.kind.as_str().to_string(),
            status: event.status,
            occurred_at_ms: event.occurred_at_ms,
            stale: event.stale,
            recorded_at: event.recorded_at,
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
