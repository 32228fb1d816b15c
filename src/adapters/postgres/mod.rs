//! PostgreSQL adapters - Database implementations for billing ports.
//!
//! - `PostgresBillingStore` - Transactional writer (row locks + ledger key)
//! - `PostgresBillingReader` - Read model queries

mod billing_reader;
mod billing_rows;
mod billing_store;

pub use billing_reader::PostgresBillingReader;
pub use billing_store::PostgresBillingStore;

use sqlx::PgPool;

use crate::domain::foundation::DomainError;

/// Applies the embedded migrations in `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::database(format!("Migration failed: {}", e)))?;
    tracing::info!("Database migrations completed");
    Ok(())
}
