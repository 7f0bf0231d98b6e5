//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port against the Stripe REST API
//! (payment intents, checkout sessions, Connect accounts and account links)
//! with form-encoded requests and HTTP basic auth using the secret key.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key).with_base_url("http://localhost:12111");
//! let provider = StripePaymentProvider::new(config, reqwest::Client::new());
//! ```

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::ports::{
    CheckoutSession, ConnectedAccount, CreateCheckoutRequest, CreateConnectedAccountRequest,
    CreateOnboardingLinkRequest, CreatePaymentIntentRequest, OnboardingLink, PaymentError,
    PaymentErrorCode, PaymentIntent, PaymentProvider,
};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: "https://api.stripe.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base_url", &self.api_base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeCheckoutSession {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeAccount {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeAccountLink {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    error: StripeErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Builds the form for a destination-charge payment intent.
fn payment_intent_form(request: &CreatePaymentIntentRequest) -> Vec<(&'static str, String)> {
    vec![
        ("amount", request.amount.to_string()),
        ("currency", request.currency.clone()),
        ("automatic_payment_methods[enabled]", "true".to_string()),
        (
            "application_fee_amount",
            request.application_fee_amount.to_string(),
        ),
        ("transfer_data[destination]", request.destination_account.clone()),
        ("metadata[appointment_id]", request.appointment_id.to_string()),
    ]
}

/// Builds the form for a subscription-mode checkout session.
///
/// The user id goes on both the session and the subscription it creates,
/// so deletion events can be attributed as well.
fn checkout_form(request: &CreateCheckoutRequest) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("mode", "subscription".to_string()),
        ("line_items[0][price]", request.plan_id.clone()),
        ("line_items[0][quantity]", "1".to_string()),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
        ("client_reference_id", request.user_id.to_string()),
        ("metadata[user_id]", request.user_id.to_string()),
        (
            "subscription_data[metadata][user_id]",
            request.user_id.to_string(),
        ),
    ];
    if !request.email.is_empty() {
        form.push(("customer_email", request.email.clone()));
    }
    form
}

/// Builds the form for an Express connected account able to receive
/// destination-charge transfers.
fn connected_account_form(request: &CreateConnectedAccountRequest) -> Vec<(&'static str, String)> {
    vec![
        ("type", "express".to_string()),
        ("country", request.country.clone()),
        ("email", request.email.clone()),
        ("capabilities[card_payments][requested]", "true".to_string()),
        ("capabilities[transfers][requested]", "true".to_string()),
        ("metadata[provider_id]", request.provider_id.to_string()),
    ]
}

fn onboarding_link_form(request: &CreateOnboardingLinkRequest) -> Vec<(&'static str, String)> {
    vec![
        ("account", request.account_id.clone()),
        ("refresh_url", request.refresh_url.clone()),
        ("return_url", request.return_url.clone()),
        ("type", "account_onboarding".to_string()),
    ]
}

fn error_code_for(status: StatusCode) -> PaymentErrorCode {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PaymentErrorCode::AuthenticationError,
        StatusCode::TOO_MANY_REQUESTS => PaymentErrorCode::RateLimitExceeded,
        s if s.is_client_error() => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentProvider {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentProvider {
    pub fn new(config: StripeConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&'static str, String)],
    ) -> Result<T, PaymentError> {
        let response = self
            .http_client
            .post(self.config.endpoint(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, path, "Stripe request failed");
                PaymentError::network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body: StripeErrorBody = response.json().await.unwrap_or_default();
            tracing::warn!(%status, path, code = ?body.error.code, "Stripe API error");

            let mut err = PaymentError::new(
                error_code_for(status),
                body.error
                    .message
                    .unwrap_or_else(|| format!("Stripe API returned {}", status)),
            );
            if let Some(code) = body.error.code {
                err = err.with_provider_code(code);
            }
            return Err(err);
        }

        response.json::<T>().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentProvider {
    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let intent: StripePaymentIntent = self
            .post_form("/v1/payment_intents", &payment_intent_form(&request))
            .await?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            PaymentError::provider("Payment intent returned without a client secret")
        })?;

        tracing::info!(
            payment_intent_id = %intent.id,
            appointment_id = %request.appointment_id,
            "Created payment intent"
        );

        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
        })
    }

    async fn create_subscription_checkout(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let session: StripeCheckoutSession = self
            .post_form("/v1/checkout/sessions", &checkout_form(&request))
            .await?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::provider("Checkout session returned without a URL"))?;

        tracing::info!(
            session_id = %session.id,
            user_id = %request.user_id,
            "Created subscription checkout session"
        );

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn create_connected_account(
        &self,
        request: CreateConnectedAccountRequest,
    ) -> Result<ConnectedAccount, PaymentError> {
        let account: StripeAccount = self
            .post_form("/v1/accounts", &connected_account_form(&request))
            .await?;

        tracing::info!(
            account_id = %account.id,
            provider_id = request.provider_id,
            "Created connected account"
        );

        Ok(ConnectedAccount { id: account.id })
    }

    async fn create_onboarding_link(
        &self,
        request: CreateOnboardingLinkRequest,
    ) -> Result<OnboardingLink, PaymentError> {
        let link: StripeAccountLink = self
            .post_form("/v1/account_links", &onboarding_link_form(&request))
            .await?;

        Ok(OnboardingLink { url: link.url })
    }
}

impl std::fmt::Debug for StripePaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripePaymentProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
