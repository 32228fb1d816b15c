//! GetProcessedEventHandler - Query handler for ledger audits.

use std::sync::Arc;

use crate::domain::billing::{BillingProvider, ProcessedEvent};
use crate::domain::foundation::{DomainError, EventId};
use crate::ports::BillingReader;

#[derive(Debug, Clone)]
pub struct GetProcessedEventQuery {
    pub provider: BillingProvider,
    pub event_id: EventId,
}

pub type GetProcessedEventResult = Option<ProcessedEvent>;

pub struct GetProcessedEventHandler {
    reader: Arc<dyn BillingReader>,
}

impl GetProcessedEventHandler {
    pub fn new(reader: Arc<dyn BillingReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: GetProcessedEventQuery,
    ) -> Result<GetProcessedEventResult, DomainError> {
        self.reader
            .find_processed_event(query.provider, &query.event_id)
            .await
    }
}
