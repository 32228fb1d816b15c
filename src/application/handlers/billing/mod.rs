//! Billing handlers.
//!
//! ## Commands
//! - Card gateway webhooks (subscriptions, gifts, boosts)
//! - Entitlement provider webhooks (subscriptions)
//!
//! ## Queries
//! - Subscription state per user
//! - Funding per wish
//! - Ledger rows per event id

mod get_funding;
mod get_processed_event;
mod get_subscription;
mod handle_card_webhook;
mod handle_entitlement_webhook;
mod reconcile;

pub use reconcile::BillingPolicy;

// Commands
pub use handle_card_webhook::{HandleCardWebhookCommand, HandleCardWebhookHandler};
pub use handle_entitlement_webhook::{
    HandleEntitlementWebhookCommand, HandleEntitlementWebhookHandler,
};

// Queries
pub use get_funding::{GetFundingHandler, GetFundingQuery, GetFundingResult};
pub use get_processed_event::{
    GetProcessedEventHandler, GetProcessedEventQuery, GetProcessedEventResult,
};
pub use get_subscription::{GetSubscriptionHandler, GetSubscriptionQuery, GetSubscriptionResult};
