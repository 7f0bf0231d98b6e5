//! HTTP DTOs for billing endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::billing::SubscriptionStatus;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start paying for an appointment.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCheckoutRequest {
    pub appointment_id: i64,
    /// Minor units.
    pub amount: i64,
    /// Defaults to the configured currency.
    #[serde(default)]
    pub currency: Option<String>,
}

/// Request to start a subscription checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionCheckoutRequest {
    /// Processor price id of the plan.
    pub plan_id: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Client secret the frontend confirms the payment with.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentCheckoutResponse {
    pub client_secret: String,
}

/// Hosted checkout page to redirect to.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionCheckoutResponse {
    pub checkout_url: String,
}

/// Hosted onboarding page for the provider's payout account.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderOnboardingResponse {
    pub account_id: String,
    pub onboarding_url: String,
}

/// The caller's subscription state.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatusResponse {
    /// Null when the caller never started a checkout.
    pub status: Option<SubscriptionStatus>,
    pub active: bool,
}
