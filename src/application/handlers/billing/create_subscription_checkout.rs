//! CreateSubscriptionCheckoutHandler - starts a subscription term.

use std::sync::Arc;

use crate::domain::billing::SubscriptionStatus;
use crate::domain::foundation::{DomainError, ErrorCode, Principal, ValidationError};
use crate::ports::{
    BillingStore, CreateCheckoutRequest, PaymentProvider, PendingSubscription, SubscriptionReader,
};

/// Redirect targets for the hosted checkout page.
#[derive(Debug, Clone)]
pub struct SubscriptionCheckoutSettings {
    pub success_url: String,
    pub cancel_url: String,
}

/// Command to start a subscription checkout for the caller.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionCheckoutCommand {
    pub principal: Principal,
    pub plan_id: String,
}

/// Result of a subscription checkout.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionCheckoutResult {
    pub session_id: String,
    pub checkout_url: String,
}

/// Handler for subscription checkouts.
pub struct CreateSubscriptionCheckoutHandler {
    store: Arc<dyn BillingStore>,
    provider: Arc<dyn PaymentProvider>,
    settings: SubscriptionCheckoutSettings,
}

impl CreateSubscriptionCheckoutHandler {
    pub fn new(
        store: Arc<dyn BillingStore>,
        provider: Arc<dyn PaymentProvider>,
        settings: SubscriptionCheckoutSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateSubscriptionCheckoutCommand,
    ) -> Result<CreateSubscriptionCheckoutResult, DomainError> {
        let plan_id = cmd.plan_id.trim();
        if plan_id.is_empty() {
            return Err(ValidationError::empty_field("plan_id").into());
        }

        let user_id = cmd.principal.subject_id;
        if self.store.subscription_status(&user_id).await? == Some(SubscriptionStatus::Active) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionAlreadyActive,
                "Subscription is already active",
            ));
        }

        let session = self
            .provider
            .create_subscription_checkout(CreateCheckoutRequest {
                user_id: user_id.clone(),
                email: cmd.principal.email,
                plan_id: plan_id.to_string(),
                success_url: self.settings.success_url.clone(),
                cancel_url: self.settings.cancel_url.clone(),
            })
            .await?;

        self.store
            .upsert_pending_subscription(&PendingSubscription {
                user_id: user_id.clone(),
                external_session_id: session.id.clone(),
                plan_id: plan_id.to_string(),
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            session_id = %session.id,
            plan_id,
            "Subscription checkout started"
        );

        Ok(CreateSubscriptionCheckoutResult {
            session_id: session.id,
            checkout_url: session.url,
        })
    }
}
