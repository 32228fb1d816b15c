//! Wish Billing - Billing-event reconciliation service
//!
//! Accepts signed webhooks from a card gateway and a mobile entitlement
//! provider, normalizes them into one event vocabulary, and applies each
//! event exactly once per subject in delivery-order-independent fashion.
//! Subscription state, supporter entitlements and wish funding are exposed
//! through a read model.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
