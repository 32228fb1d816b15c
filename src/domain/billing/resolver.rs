//! State resolver - pure mapping from event vocabulary to subscription state.

use std::collections::HashMap;

use super::{EventKind, PeriodType, SubscriptionStatus};
use crate::domain::foundation::ValidationError;

/// Maps an event kind to the subscription status it implies.
///
/// Returns `None` for kinds that do not move subscription state
/// (payment completions), which callers acknowledge without mutation.
pub fn resolve_status(kind: EventKind, period_type: PeriodType) -> Option<SubscriptionStatus> {
    match kind {
        EventKind::SubscriptionActivated | EventKind::SubscriptionRenewed => {
            if period_type == PeriodType::Trial {
                Some(SubscriptionStatus::Trialing)
            } else {
                Some(SubscriptionStatus::Active)
            }
        }
        EventKind::SubscriptionCanceled | EventKind::SubscriptionBillingIssue => {
            Some(SubscriptionStatus::Canceled)
        }
        EventKind::PaymentCompleted => None,
    }
}

/// Derives the profile entitlement flag.
///
/// Sandbox purchases never unlock production perks.
pub fn entitlement_for(status: SubscriptionStatus, is_sandbox: bool) -> bool {
    !is_sandbox && status.is_entitled()
}

/// Static product-reference to plan-key table, built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanCatalog {
    plans: HashMap<String, String>,
}

impl PlanCatalog {
    /// Builds a catalog from configured entries.
    ///
    /// Each entry is either `product` (the plan key is the product id itself)
    /// or `product=plan`.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut plans = HashMap::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            let (product, plan) = match entry.split_once('=') {
                Some((product, plan)) => (product.trim(), plan.trim()),
                None => (entry, entry),
            };
            if product.is_empty() || plan.is_empty() {
                return Err(ValidationError::invalid_format(
                    "plan_products",
                    format!("malformed entry '{}'", entry),
                ));
            }
            plans.insert(product.to_string(), plan.to_string());
        }
        Ok(Self { plans })
    }

    /// Parses a comma-separated list of entries.
    pub fn parse(list: &str) -> Result<Self, ValidationError> {
        Self::from_entries(list.split(','))
    }

    /// Looks up the plan for a product reference.
    ///
    /// Unknown or missing products resolve to `None`; the status is still
    /// applied without a plan.
    pub fn plan_for(&self, product_ref: Option<&str>) -> Option<String> {
        product_ref.and_then(|p| self.plans.get(p)).cloned()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
