//! StartProviderOnboardingHandler - connects a provider for payouts.
//!
//! A provider needs a connected account before customers can pay for their
//! appointments. The account is created once and stored; every call returns
//! a fresh onboarding link for it.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, Principal};
use crate::ports::{
    BillingStore, CreateConnectedAccountRequest, CreateOnboardingLinkRequest, PaymentProvider,
};

/// Settings for connected-account onboarding.
#[derive(Debug, Clone)]
pub struct ProviderOnboardingSettings {
    /// Two-letter country code for new accounts.
    pub country: String,
    pub refresh_url: String,
    pub return_url: String,
}

/// Command to start payout onboarding for the calling provider.
#[derive(Debug, Clone)]
pub struct StartProviderOnboardingCommand {
    pub principal: Principal,
}

/// Result of starting onboarding.
#[derive(Debug, Clone)]
pub struct StartProviderOnboardingResult {
    pub account_id: String,
    pub onboarding_url: String,
}

/// Handler for provider payout onboarding.
pub struct StartProviderOnboardingHandler {
    store: Arc<dyn BillingStore>,
    provider: Arc<dyn PaymentProvider>,
    settings: ProviderOnboardingSettings,
}

impl StartProviderOnboardingHandler {
    pub fn new(
        store: Arc<dyn BillingStore>,
        provider: Arc<dyn PaymentProvider>,
        settings: ProviderOnboardingSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: StartProviderOnboardingCommand,
    ) -> Result<StartProviderOnboardingResult, DomainError> {
        // Appointments reference providers by integer id
        let provider_id = cmd.principal.subject_id.as_owner_id()?;

        let account_id = match self.store.provider_account(provider_id).await? {
            Some(existing) => existing,
            None => {
                let account = self
                    .provider
                    .create_connected_account(CreateConnectedAccountRequest {
                        provider_id,
                        email: cmd.principal.email,
                        country: self.settings.country.clone(),
                    })
                    .await?;
                // Saved before requesting the link; a failed link must not orphan it.
                self.store
                    .save_provider_account(provider_id, &account.id)
                    .await?;
                account.id
            }
        };

        let link = self
            .provider
            .create_onboarding_link(CreateOnboardingLinkRequest {
                account_id: account_id.clone(),
                refresh_url: self.settings.refresh_url.clone(),
                return_url: self.settings.return_url.clone(),
            })
            .await?;

        tracing::info!(provider_id, account_id = %account_id, "Provider onboarding started");

        Ok(StartProviderOnboardingResult {
            account_id,
            onboarding_url: link.url,
        })
    }
}
