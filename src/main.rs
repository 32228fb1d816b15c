//! Wish Billing server entry point.

use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use wish_billing::adapters::{
    billing_router, request_timeout_middleware, run_migrations, BillingAppState,
    PostgresBillingReader, PostgresBillingStore, StripeWebhookVerifier,
};
use wish_billing::config::AppConfig;
use wish_billing::domain::billing::EntitlementWebhookVerifier;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let addr = config.server.socket_addr()?;
    tracing::info!(
        environment = ?config.server.environment,
        %addr,
        "Starting wish-billing"
    );

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        run_migrations(&pool).await?;
    }

    let payment = &config.payment;
    let state = BillingAppState {
        card_verifier: Arc::new(StripeWebhookVerifier::new(
            payment.card_webhook_secret.clone(),
        )),
        entitlement_verifier: EntitlementWebhookVerifier::new(
            payment.entitlement_webhook_secret.clone(),
            payment.entitlement_signature_algorithm,
        ),
        billing_store: Arc::new(PostgresBillingStore::new(pool.clone())),
        billing_reader: Arc::new(PostgresBillingReader::new(pool)),
        policy: Arc::new(config.billing_policy()?),
    };
    tracing::debug!(
        plans = state.policy.plans.len(),
        boost_hours = state.policy.boost_hours,
        "Billing policy loaded"
    );

    let app = Router::new()
        .nest("/api", billing_router())
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            config.server.request_timeout(),
            request_timeout_middleware,
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// JSON logs in production, human-readable output otherwise.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if config.is_production() {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
