//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    get_funding, get_processed_event, get_subscription, handle_card_webhook,
    handle_entitlement_webhook, BillingAppState,
};

/// Create the provider webhook router.
///
/// Webhooks carry no user authentication; they are verified via signature.
///
/// # Routes
/// - `POST /card` - Card gateway webhooks
/// - `POST /entitlements` - Entitlement provider webhooks
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/card", post(handle_card_webhook))
        .route("/entitlements", post(handle_entitlement_webhook))
}

/// Create the read model router.
///
/// # Routes
/// - `GET /subscriptions/:user_id` - Reconciled subscription for a user
/// - `GET /wishes/:wish_id/funding` - Funding totals for a wish
/// - `GET /events/:provider/:event_id` - Ledger row for auditing
pub fn read_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/subscriptions/:user_id", get(get_subscription))
        .route("/wishes/:wish_id/funding", get(get_funding))
        .route("/events/:provider/:event_id", get(get_processed_event))
}

/// Create the complete billing router, suitable for mounting at `/api`.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", billing_router())
///     .with_state(app_state);
/// ```
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/webhooks", webhook_routes())
        .nest("/billing", read_routes())
}
