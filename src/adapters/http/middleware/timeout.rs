//! Request deadline middleware.
//!
//! A request that outlives the deadline is answered with 500 and code
//! `TIMEOUT`, the same class as any other internal failure, so providers
//! redeliver. The handler future is dropped at the deadline and any open
//! store transaction rolls back with it.
//!
//! ```ignore
//! let app = Router::new()
//!     .nest("/api", billing_router())
//!     .with_state(state)
//!     .layer(middleware::from_fn_with_state(deadline, request_timeout_middleware));
//! ```

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::billing::ErrorResponse;

/// Error code returned when a request exceeds its deadline.
pub const TIMEOUT_CODE: &str = "TIMEOUT";

/// Runs the rest of the stack under `deadline`.
pub async fn request_timeout_middleware(
    State(deadline): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match tokio::time::timeout(deadline, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::error!(
                %method,
                path = %path,
                deadline_ms = deadline.as_millis() as u64,
                "Request timed out, provider will retry"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(TIMEOUT_CODE, "Request timed out")),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(deadline: Duration) -> Router {
        Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .route("/fast", get(|| async { "done" }))
            .layer(middleware::from_fn_with_state(
                deadline,
                request_timeout_middleware,
            ))
    }

    fn get_request(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn slow_request_is_internal_error() {
        let response = app(Duration::from_millis(20))
            .oneshot(get_request("/slow"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], TIMEOUT_CODE);
    }

    #[tokio::test]
    async fn fast_request_passes_through() {
        let response = app(Duration::from_secs(5))
            .oneshot(get_request("/fast"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
