//! Billing handlers.
//!
//! The synchronous half of billing: these handlers create checkout objects
//! at the processor and write the `pending` records. Everything after that
//! is the reconciler's job.
//!
//! ## Commands
//! - Starting a payment for an appointment
//! - Starting a subscription checkout
//! - Starting payout onboarding for a provider
//!
//! ## Queries
//! - Current subscription status

mod create_payment_checkout;
mod create_subscription_checkout;
mod get_subscription_status;
mod start_provider_onboarding;

// Commands
pub use create_payment_checkout::{
    application_fee, CreatePaymentCheckoutCommand, CreatePaymentCheckoutHandler,
    CreatePaymentCheckoutResult, PaymentCheckoutSettings,
};
pub use create_subscription_checkout::{
    CreateSubscriptionCheckoutCommand, CreateSubscriptionCheckoutHandler,
    CreateSubscriptionCheckoutResult, SubscriptionCheckoutSettings,
};
pub use start_provider_onboarding::{
    ProviderOnboardingSettings, StartProviderOnboardingCommand, StartProviderOnboardingHandler,
    StartProviderOnboardingResult,
};

// Queries
pub use get_subscription_status::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, GetSubscriptionStatusResult,
};
