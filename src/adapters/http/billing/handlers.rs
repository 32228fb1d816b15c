//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::billing::{
    BillingPolicy, GetFundingHandler, GetFundingQuery, GetProcessedEventHandler,
    GetProcessedEventQuery, GetSubscriptionHandler, GetSubscriptionQuery,
    HandleCardWebhookCommand, HandleCardWebhookHandler, HandleEntitlementWebhookCommand,
    HandleEntitlementWebhookHandler,
};
use crate::domain::billing::{
    ApplyOutcome, BillingProvider, EntitlementWebhookVerifier, WebhookError,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, Timestamp, UserId, ValidationError, WishId,
};
use crate::ports::{BillingReader, BillingStore, CardWebhookVerifier};

use super::dto::{
    ErrorResponse, FundingResponse, ProcessedEventResponse, SubscriptionResponse,
    WebhookAckResponse,
};

/// Header carrying the card gateway signature (`t=...,v1=...`).
pub const CARD_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Header carrying the entitlement provider's base64 HMAC.
pub const ENTITLEMENT_SIGNATURE_HEADER: &str = "X-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every dependency is cheap to clone.
#[derive(Clone)]
pub struct BillingAppState {
    pub card_verifier: Arc<dyn CardWebhookVerifier>,
    pub entitlement_verifier: EntitlementWebhookVerifier,
    pub billing_store: Arc<dyn BillingStore>,
    pub billing_reader: Arc<dyn BillingReader>,
    pub policy: Arc<BillingPolicy>,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn card_webhook_handler(&self) -> HandleCardWebhookHandler {
        HandleCardWebhookHandler::new(
            self.card_verifier.clone(),
            self.billing_store.clone(),
            self.policy.clone(),
        )
    }

    pub fn entitlement_webhook_handler(&self) -> HandleEntitlementWebhookHandler {
        HandleEntitlementWebhookHandler::new(
            self.entitlement_verifier.clone(),
            self.billing_store.clone(),
            self.policy.clone(),
        )
    }

    pub fn get_subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(self.billing_reader.clone())
    }

    pub fn get_funding_handler(&self) -> GetFundingHandler {
        GetFundingHandler::new(self.billing_reader.clone())
    }

    pub fn get_processed_event_handler(&self) -> GetProcessedEventHandler {
        GetProcessedEventHandler::new(self.billing_reader.clone())
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/card - Card gateway webhook
pub async fn handle_card_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let handler = state.card_webhook_handler();
    let cmd = HandleCardWebhookCommand {
        payload: body.to_vec(),
        signature: header_value(&headers, CARD_SIGNATURE_HEADER),
    };

    let outcome = handler.handle(cmd).await?;

    Ok(Json(WebhookAckResponse::from(outcome)))
}

/// POST /api/webhooks/entitlements - Entitlement provider webhook
pub async fn handle_entitlement_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let handler = state.entitlement_webhook_handler();
    let cmd = HandleEntitlementWebhookCommand {
        payload: body.to_vec(),
        signature: header_value(&headers, ENTITLEMENT_SIGNATURE_HEADER),
    };

    let outcome = handler.handle(cmd).await?;

    Ok(Json(WebhookAckResponse::from(outcome)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/billing/subscriptions/:user_id - Reconciled subscription for a user
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let user_id = UserId::new(user_id)?;
    let handler = state.get_subscription_handler();

    let result = handler
        .handle(GetSubscriptionQuery {
            user_id: user_id.clone(),
        })
        .await?;

    match result {
        Some(subscription) => Ok(Json(SubscriptionResponse::from(subscription))),
        None => Err(BillingApiError::not_found("Subscription", user_id)),
    }
}

/// GET /api/billing/wishes/:wish_id/funding - Funding totals for a wish
pub async fn get_funding(
    State(state): State<BillingAppState>,
    Path(wish_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let wish_id = WishId::new(wish_id)?;
    let handler = state.get_funding_handler();

    let result = handler
        .handle(GetFundingQuery {
            wish_id: wish_id.clone(),
        })
        .await?;

    match result {
        Some(record) => Ok(Json(FundingResponse::from_record(record, Timestamp::now()))),
        None => Err(BillingApiError::not_found("Funding", wish_id)),
    }
}

/// GET /api/billing/events/:provider/:event_id - Ledger row for auditing
pub async fn get_processed_event(
    State(state): State<BillingAppState>,
    Path((provider, event_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, BillingApiError> {
    let provider: BillingProvider = provider.parse()?;
    let event_id = EventId::new(event_id)?;
    let handler = state.get_processed_event_handler();

    let result = handler
        .handle(GetProcessedEventQuery {
            provider,
            event_id: event_id.clone(),
        })
        .await?;

    match result {
        Some(event) => Ok(Json(ProcessedEventResponse::from(event))),
        None => Err(BillingApiError::not_found("Processed event", event_id)),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Converts webhook errors to provider-facing responses.
///
/// `Ignored` is acknowledged with 200 so the provider stops redelivering.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        if let WebhookError::Ignored(_) = self.0 {
            return (StatusCode::OK, Json(WebhookAckResponse::from(ApplyOutcome::Ignored)))
                .into_response();
        }

        let status = self.0.status_code();
        if self.0.is_retryable() {
            tracing::error!(error = %self.0, "Webhook processing failed, provider will retry");
        }

        let body = ErrorResponse::new(self.0.code(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}

/// API error type for the read endpoints.
#[derive(Debug)]
pub enum BillingApiError {
    NotFound(String),
    Validation(ValidationError),
    Domain(DomainError),
}

impl BillingApiError {
    fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} not found: {}", resource, id))
    }
}

impl From<ValidationError> for BillingApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<DomainError> for BillingApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            BillingApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new(ErrorCode::NotFound.to_string(), message),
            ),
            BillingApiError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(ErrorCode::ValidationFailed.to_string(), err.to_string()),
            ),
            BillingApiError::Domain(err) => {
                let status = match err.code {
                    ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
                    ErrorCode::NotFound => StatusCode::NOT_FOUND,
                    ErrorCode::DatabaseError => {
                        tracing::error!(error = %err, "Billing read failed");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, ErrorResponse::new(err.code.to_string(), err.message))
            }
        };

        (status, Json(body)).into_response()
    }
}
