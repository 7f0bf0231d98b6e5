//! SubscriptionGuard - read-side access check on subscription state.
//!
//! Fails closed: a missing record, a non-active status, an unusable
//! subject, and a store error all deny.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, SubjectId};
use crate::ports::SubscriptionReader;

/// Checks that a user holds an active subscription.
#[derive(Clone)]
pub struct SubscriptionGuard {
    reader: Arc<dyn SubscriptionReader>,
}

impl SubscriptionGuard {
    pub fn new(reader: Arc<dyn SubscriptionReader>) -> Self {
        Self { reader }
    }

    /// Returns true only if the user's subscription is active.
    pub async fn is_active(&self, user_id: &SubjectId) -> bool {
        match self.reader.subscription_status(user_id).await {
            Ok(Some(status)) => status.grants_access(),
            Ok(None) => false,
            Err(e) => {
                tracing::error!(
                    user_id = %user_id,
                    error = %e,
                    "Subscription lookup failed, denying access"
                );
                false
            }
        }
    }

    /// # Errors
    ///
    /// `SubscriptionRequired` unless the subscription is active.
    pub async fn require_active(&self, user_id: &SubjectId) -> Result<(), DomainError> {
        if self.is_active(user_id).await {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::SubscriptionRequired,
                "An active subscription is required to create appointments",
            ))
        }
    }
}
