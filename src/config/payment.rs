//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::{PlanCatalog, SignatureAlgorithm, DEFAULT_BOOST_HOURS};

/// Payment configuration (card gateway and entitlement provider)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Card gateway webhook signing secret (`whsec_...`)
    pub card_webhook_secret: SecretString,

    /// Entitlement provider webhook HMAC secret
    pub entitlement_webhook_secret: SecretString,

    /// HMAC digest used by the entitlement provider
    #[serde(default)]
    pub entitlement_signature_algorithm: SignatureAlgorithm,

    /// Comma-separated `product` or `product=plan` entries
    #[serde(default = "default_plan_products")]
    pub plan_products: String,

    /// How long a completed boost keeps a wish promoted
    #[serde(default = "default_boost_duration_hours")]
    pub boost_duration_hours: i64,
}

impl PaymentConfig {
    /// Build the product-to-plan catalog
    pub fn plan_catalog(&self) -> Result<PlanCatalog, ValidationError> {
        PlanCatalog::parse(&self.plan_products)
            .map_err(|e| ValidationError::InvalidPlanProducts(e.to_string()))
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let card_secret = self.card_webhook_secret.expose_secret();
        if card_secret.is_empty() {
            return Err(ValidationError::MissingRequired("CARD_WEBHOOK_SECRET"));
        }
        if !card_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidCardWebhookSecret);
        }
        if self.entitlement_webhook_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("ENTITLEMENT_WEBHOOK_SECRET"));
        }
        if !(1..=720).contains(&self.boost_duration_hours) {
            return Err(ValidationError::InvalidBoostDuration);
        }
        self.plan_catalog()?;
        Ok(())
    }
}

fn default_plan_products() -> String {
    "patron_monthly,patron_yearly".to_string()
}

fn default_boost_duration_hours() -> i64 {
    DEFAULT_BOOST_HOURS
}
