//! GetFundingHandler - Query handler for a wish's funding totals.

use std::sync::Arc;

use crate::domain::billing::FundingRecord;
use crate::domain::foundation::{DomainError, WishId};
use crate::ports::BillingReader;

/// Query to get a wish's funding record.
#[derive(Debug, Clone)]
pub struct GetFundingQuery {
    pub wish_id: WishId,
}

/// `None` when the wish was never gifted or boosted.
pub type GetFundingResult = Option<FundingRecord>;

pub struct GetFundingHandler {
    reader: Arc<dyn BillingReader>,
}

impl GetFundingHandler {
    pub fn new(reader: Arc<dyn BillingReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(&self, query: GetFundingQuery) -> Result<GetFundingResult, DomainError> {
        self.reader.get_funding(&query.wish_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::PaymentCompletion;
    use crate::domain::billing::PaymentPurpose;
    use crate::domain::foundation::{CheckoutSessionId, EventId, Timestamp, UserId};
    use crate::ports::BillingStore;

    #[tokio::test]
    async fn returns_boost_window() {
        let store = Arc::new(InMemoryBillingStore::new());
        let before = Timestamp::now();
        store
            .apply_payment_completion(
                &PaymentCompletion {
                    event_id: EventId::new("evt_boost").unwrap(),
                    payer_user_id: UserId::new("payer").unwrap(),
                    session_id: CheckoutSessionId::new("s_boost").unwrap(),
                    purpose: PaymentPurpose::Boost {
                        wish_id: WishId::new("w1").unwrap(),
                    },
                    occurred_at_ms: 1_000,
                },
                24,
            )
            .await
            .unwrap();
        let handler = GetFundingHandler::new(store);

        let funding = handler
            .handle(GetFundingQuery {
                wish_id: WishId::new("w1").unwrap(),
            })
            .await
            .unwrap()
            .unwrap();

        let until = funding.boosted_until.unwrap();
        assert!(!before.plus_hours(24).is_after(&until));
        assert!(funding.is_boosted(Timestamp::now()));
        assert_eq!(funding.funding_supporters, 0);
    }

    #[tokio::test]
    async fn returns_none_for_unfunded_wish() {
        let handler = GetFundingHandler::new(Arc::new(InMemoryBillingStore::new()));

        let result = handler
            .handle(GetFundingQuery {
                wish_id: WishId::new("w_none").unwrap(),
            })
            .await
            .unwrap();

        assert!(result.is_none());
    }
}
