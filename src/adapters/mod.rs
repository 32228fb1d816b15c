//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum webhook and read endpoints, request middleware
//! - `memory` - In-memory billing store (tests, local development)
//! - `postgres` - PostgreSQL billing store and reader
//! - `stripe` - Card gateway signature verification

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use http::{billing_router, request_timeout_middleware, BillingAppState};
pub use memory::InMemoryBillingStore;
pub use postgres::{run_migrations, PostgresBillingReader, PostgresBillingStore};
pub use stripe::StripeWebhookVerifier;
