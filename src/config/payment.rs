//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment processor configuration (Stripe).
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    pub stripe_api_key: SecretString,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: SecretString,

    #[serde(default = "default_api_base")]
    pub api_base_url: String,

    /// Maximum signature age in seconds
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,

    /// Where the hosted checkout returns after payment
    pub checkout_success_url: String,

    /// Where the hosted checkout returns on abandon
    pub checkout_cancel_url: String,

    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Platform share of each appointment payment
    #[serde(default = "default_platform_fee_percent")]
    pub platform_fee_percent: u8,

    /// Country of new provider payout accounts
    #[serde(default = "default_connect_country")]
    pub connect_country: String,

    /// Where an expired onboarding link sends the provider
    pub onboarding_refresh_url: String,

    /// Where finished onboarding returns the provider
    pub onboarding_return_url: String,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let api_key = self.stripe_api_key.expose_secret();
        let webhook_secret = self.stripe_webhook_secret.expose_secret();

        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("payment.stripe_api_key"));
        }
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("payment.stripe_webhook_secret"));
        }
        if !api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if self.checkout_success_url.is_empty() {
            return Err(ValidationError::MissingRequired("payment.checkout_success_url"));
        }
        if self.checkout_cancel_url.is_empty() {
            return Err(ValidationError::MissingRequired("payment.checkout_cancel_url"));
        }
        if self.default_currency.len() != 3
            || !self.default_currency.chars().all(|c| c.is_ascii_lowercase())
        {
            return Err(ValidationError::InvalidCurrency(self.default_currency.clone()));
        }
        if self.platform_fee_percent > 100 {
            return Err(ValidationError::InvalidFeePercent);
        }
        if self.connect_country.len() != 2
            || !self.connect_country.chars().all(|c| c.is_ascii_uppercase())
        {
            return Err(ValidationError::InvalidCountry(self.connect_country.clone()));
        }
        if self.onboarding_refresh_url.is_empty() {
            return Err(ValidationError::MissingRequired("payment.onboarding_refresh_url"));
        }
        if self.onboarding_return_url.is_empty() {
            return Err(ValidationError::MissingRequired("payment.onboarding_return_url"));
        }
        Ok(())
    }
}

fn default_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_webhook_tolerance() -> i64 {
    300
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_platform_fee_percent() -> u8 {
    10
}

fn default_connect_country() -> String {
    "US".to_string()
}
