//! GetSubscriptionHandler - Query handler for a user's reconciled subscription.

use std::sync::Arc;

use crate::domain::billing::SubscriptionState;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::BillingReader;

/// Query to get a user's subscription state.
#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub user_id: UserId,
}

/// `None` when no subscription event was ever applied for the user.
pub type GetSubscriptionResult = Option<SubscriptionState>;

pub struct GetSubscriptionHandler {
    reader: Arc<dyn BillingReader>,
}

impl GetSubscriptionHandler {
    pub fn new(reader: Arc<dyn BillingReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionQuery,
    ) -> Result<GetSubscriptionResult, DomainError> {
        self.reader.get_subscription(&query.user_id).await
    }
}
