//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `BillingStore` - Transactional writer for reconciled billing state
//! - `BillingReader` - Read model queries
//! - `CardWebhookVerifier` - Card gateway "verify and parse"

mod billing_reader;
mod billing_store;
mod card_webhook_verifier;

pub use billing_reader::BillingReader;
pub use billing_store::BillingStore;
pub use card_webhook_verifier::CardWebhookVerifier;
