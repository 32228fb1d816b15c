//! HTTP middleware for axum.
//!
//! - `timeout` - Per-request deadline, answered as a retryable 500

pub mod timeout;

pub use timeout::{request_timeout_middleware, TIMEOUT_CODE};
