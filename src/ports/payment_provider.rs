//! Payment provider port for external payment processing.
//!
//! Covers the synchronous calls the checkout and provider onboarding paths
//! make. Outcomes of checkouts arrive later as webhook events, not through
//! this port.

use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode, SubjectId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment intent for one appointment, routed to the
    /// provider's connected account.
    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError>;

    /// Create a checkout session in subscription mode.
    ///
    /// Returns a URL for the customer to complete payment.
    async fn create_subscription_checkout(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Create a connected payout account for a provider.
    async fn create_connected_account(
        &self,
        request: CreateConnectedAccountRequest,
    ) -> Result<ConnectedAccount, PaymentError>;

    /// Create a hosted onboarding link for a connected account.
    ///
    /// Links are single-use and short-lived; a fresh one is requested each time.
    async fn create_onboarding_link(
        &self,
        request: CreateOnboardingLinkRequest,
    ) -> Result<OnboardingLink, PaymentError>;
}

/// Request to create a payment intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// Attached as `metadata[appointment_id]`.
    pub appointment_id: AppointmentId,

    /// Amount in minor units.
    pub amount: i64,

    pub currency: String,

    /// Platform fee in minor units.
    pub application_fee_amount: i64,

    /// Connected account receiving the transfer.
    pub destination_account: String,
}

/// Payment intent created at the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider's intent id (`pi_...`).
    pub id: String,

    /// Secret the client uses to confirm the payment.
    pub client_secret: String,
}

/// Request to create a subscription checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Attached as `metadata[user_id]` on the session and the subscription.
    pub user_id: SubjectId,

    /// Customer email for pre-fill.
    pub email: String,

    /// Price to subscribe to.
    pub plan_id: String,

    /// URL to redirect after successful checkout.
    pub success_url: String,

    /// URL to redirect after canceled checkout.
    pub cancel_url: String,
}

/// Checkout session for payment completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID.
    pub id: String,

    /// URL for customer to complete checkout.
    pub url: String,
}

/// Request to create a connected payout account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConnectedAccountRequest {
    /// Attached as `metadata[provider_id]`.
    pub provider_id: i64,

    pub email: String,

    /// Two-letter country code of the account.
    pub country: String,
}

/// Connected account created at the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedAccount {
    /// Processor's account id (`acct_...`).
    pub id: String,
}

/// Request for an account onboarding link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOnboardingLinkRequest {
    pub account_id: String,

    /// Where the processor sends the provider if the link has expired.
    pub refresh_url: String,

    /// Where the processor sends the provider after onboarding.
    pub return_url: String,
}

/// Hosted onboarding page for a connected account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingLink {
    pub url: String,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }

    /// Create a provider-side error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let mut domain = DomainError::new(ErrorCode::PaymentProviderError, err.message)
            .with_detail("provider_error", err.code.to_string());
        if let Some(code) = err.provider_code {
            domain = domain.with_detail("provider_code", code);
        }
        domain
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Request rejected as invalid (bad account, bad price, ...).
    InvalidRequest,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
