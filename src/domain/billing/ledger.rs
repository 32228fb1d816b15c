//! Idempotency ledger records and write outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{BillingProvider, EventKind, SubscriptionStatus};
use crate::domain::foundation::{EventId, Timestamp, UserId};

/// Append-only record of an event that reached the writer.
///
/// One row per `event_id`. Rows are never updated; a second insert for the
/// same id is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub event_id: EventId,
    pub provider: BillingProvider,
    pub subject_user_id: UserId,
    pub kind: EventKind,
    /// Status the event resolved to, if it was a subscription event.
    pub status: Option<SubscriptionStatus>,
    pub occurred_at_ms: i64,
    /// True when the event arrived after a newer one and was not applied.
    pub stale: bool,
    pub recorded_at: Timestamp,
}

/// Result of running one event through the writer.
///
/// None of these are errors; all are acknowledged to the provider with 200.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// State was mutated and the event recorded.
    Applied,
    /// The event (or its payment session) was already processed.
    Deduped,
    /// Older than the subject's last applied event; recorded, not applied.
    Stale,
    /// Unrecognized or non-actionable event; nothing written.
    Ignored,
}

impl ApplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Applied => "applied",
            ApplyOutcome::Deduped => "deduped",
            ApplyOutcome::Stale => "stale",
            ApplyOutcome::Ignored => "ignored",
        }
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
