//! Billing module - webhook reconciliation for subscriptions and wish funding.
//!
//! # Module Organization
//!
//! - `status` - Subscription status and provider enums
//! - `event` - Provider-neutral event vocabulary
//! - `card_event` / `entitlement_event` - Provider payloads and normalization
//! - `entitlement_verifier` - Entitlement webhook signatures
//! - `resolver` - Status resolution, plan catalog, entitlement
//! - `ordering` - Stale event guard
//! - `reconciler` - Write planning shared by every store
//! - `subscription`, `funding`, `ledger` - Read models and ledger records

mod card_event;
mod entitlement_event;
mod entitlement_verifier;
mod event;
mod funding;
mod ledger;
mod ordering;
mod reconciler;
mod resolver;
mod status;
mod subscription;
mod webhook_errors;

pub use card_event::{normalize_card_event, CardEvent, CardEventData, CardEventType};
pub use entitlement_event::{entitlement_kind, normalize_entitlement_event, EntitlementEvent};
pub use entitlement_verifier::{EntitlementWebhookVerifier, SignatureAlgorithm};
pub use event::{
    resolve_occurred_at_ms, EventKind, NormalizedEvent, PaymentDetails, PaymentPurpose,
    PeriodType,
};
pub use funding::{FundingRecord, PaymentSession, PaymentSessionStatus};
pub use ledger::{ApplyOutcome, ProcessedEvent};
pub use ordering::should_apply;
pub use reconciler::{
    plan_payment_write, plan_subscription_write, PaymentCompletion, PaymentWritePlan,
    SubscriptionUpdate, SubscriptionWritePlan, DEFAULT_BOOST_HOURS,
};
pub use resolver::{entitlement_for, resolve_status, PlanCatalog};
pub use status::{BillingProvider, SubscriptionStatus};
pub use subscription::{SubscriptionState, UserEntitlement};
pub use webhook_errors::WebhookError;

#[cfg(test)]
pub use card_event::CardEventBuilder;
