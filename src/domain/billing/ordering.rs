//! Ordering guard.
//!
//! Providers do not deliver webhooks in order. An event is applied only if
//! it is strictly newer than the last event applied for the same subject.

/// Returns true when an incoming event may mutate subject state.
///
/// `existing_last_event_at_ms` is `None` for a subject with no applied
/// events yet.
pub fn should_apply(existing_last_event_at_ms: Option<i64>, incoming_occurred_at_ms: i64) -> bool {
    match existing_last_event_at_ms {
        Some(existing) => incoming_occurred_at_ms > existing,
        None => true,
    }
}
