//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `billing` - Webhook normalization, ordering, resolution and write planning

pub mod billing;
pub mod foundation;
