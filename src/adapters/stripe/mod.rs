//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port: destination-charge payment
//! intents for appointments and subscription-mode checkout sessions.
//! Webhook signature verification lives in the billing domain.
//!
//! # Configuration
//!
//! - `HARMONIA__PAYMENT__API_KEY`: Stripe secret API key
//! - `HARMONIA__PAYMENT__WEBHOOK_SECRET`: Webhook signing secret (whsec_...)

mod mock_payment_provider;
mod stripe_provider;

pub use mock_payment_provider::MockPaymentProvider;
pub use stripe_provider::{StripeConfig, StripePaymentProvider};
