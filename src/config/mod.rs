//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `WISH_BILLING` prefix
//! and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use wish_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

use crate::application::BillingPolicy;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment configuration (webhook secrets, plans, boosts)
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `WISH_BILLING__*` variables:
    ///
    /// - `WISH_BILLING__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `WISH_BILLING__PAYMENT__CARD_WEBHOOK_SECRET=whsec_...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("WISH_BILLING")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        Ok(())
    }

    /// Reconciliation policy derived from the payment section
    pub fn billing_policy(&self) -> Result<BillingPolicy, ValidationError> {
        Ok(BillingPolicy {
            plans: self.payment.plan_catalog()?,
            boost_hours: self.payment.boost_duration_hours,
        })
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::SignatureAlgorithm;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "WISH_BILLING__DATABASE__URL",
        "WISH_BILLING__PAYMENT__CARD_WEBHOOK_SECRET",
        "WISH_BILLING__PAYMENT__ENTITLEMENT_WEBHOOK_SECRET",
        "WISH_BILLING__PAYMENT__ENTITLEMENT_SIGNATURE_ALGORITHM",
        "WISH_BILLING__PAYMENT__PLAN_PRODUCTS",
        "WISH_BILLING__PAYMENT__BOOST_DURATION_HOURS",
        "WISH_BILLING__SERVER__PORT",
        "WISH_BILLING__SERVER__ENVIRONMENT",
    ];

    fn set_minimal_env() {
        env::set_var("WISH_BILLING__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("WISH_BILLING__PAYMENT__CARD_WEBHOOK_SECRET", "whsec_xxx");
        env::set_var("WISH_BILLING__PAYMENT__ENTITLEMENT_WEBHOOK_SECRET", "rc_xxx");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(
            config.payment.entitlement_signature_algorithm,
            SignatureAlgorithm::Sha1
        );
        assert_eq!(config.payment.boost_duration_hours, 24);
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_payment_section_fails() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("WISH_BILLING__DATABASE__URL", "postgresql://test@localhost/test");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_server_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("WISH_BILLING__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_payment_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("WISH_BILLING__PAYMENT__ENTITLEMENT_SIGNATURE_ALGORITHM", "sha256");
        env::set_var("WISH_BILLING__PAYMENT__PLAN_PRODUCTS", "prod_1=patron_monthly");
        env::set_var("WISH_BILLING__PAYMENT__BOOST_DURATION_HOURS", "48");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(
            config.payment.entitlement_signature_algorithm,
            SignatureAlgorithm::Sha256
        );
        let policy = config.billing_policy().unwrap();
        assert_eq!(policy.boost_hours, 48);
        assert_eq!(
            policy.plans.plan_for(Some("prod_1")).as_deref(),
            Some("patron_monthly")
        );
    }
}
