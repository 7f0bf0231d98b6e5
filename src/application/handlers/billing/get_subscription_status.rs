//! GetSubscriptionStatusHandler - Query handler for the caller's subscription.

use std::sync::Arc;

use crate::domain::billing::SubscriptionStatus;
use crate::domain::foundation::{DomainError, SubjectId};
use crate::ports::SubscriptionReader;

/// Query for a user's subscription state.
#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusQuery {
    pub user_id: SubjectId,
}

/// Result of the status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSubscriptionStatusResult {
    /// `None` if the user never started a checkout.
    pub status: Option<SubscriptionStatus>,
    pub active: bool,
}

/// Handler for subscription status.
pub struct GetSubscriptionStatusHandler {
    reader: Arc<dyn SubscriptionReader>,
}

impl GetSubscriptionStatusHandler {
    pub fn new(reader: Arc<dyn SubscriptionReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionStatusQuery,
    ) -> Result<GetSubscriptionStatusResult, DomainError> {
        let status = self.reader.subscription_status(&query.user_id).await?;
        Ok(GetSubscriptionStatusResult {
            status,
            active: status.map_or(false, |s| s.grants_access()),
        })
    }
}
