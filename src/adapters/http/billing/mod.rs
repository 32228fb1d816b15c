//! HTTP adapter for billing endpoints.
//!
//! - `POST /api/webhooks/card` - Card gateway webhooks (`Stripe-Signature`)
//! - `POST /api/webhooks/entitlements` - Entitlement provider webhooks (`X-Signature`)
//! - `GET /api/billing/subscriptions/:user_id` - Subscription read model
//! - `GET /api/billing/wishes/:wish_id/funding` - Wish funding read model
//! - `GET /api/billing/events/:provider/:event_id` - Idempotency ledger audit

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{
    ErrorResponse, FundingResponse, ProcessedEventResponse, SubscriptionResponse,
    WebhookAckResponse,
};
pub use handlers::{
    BillingApiError, BillingAppState, WebhookApiError, CARD_SIGNATURE_HEADER,
    ENTITLEMENT_SIGNATURE_HEADER,
};
pub use routes::billing_router;
