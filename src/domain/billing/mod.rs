//! Billing domain - payments, subscriptions, and the webhook events that
//! drive them.
//!
//! # Module Structure
//!
//! - `payment` / `subscription` - records and their status state machines
//! - `stripe_event` - raw webhook envelope
//! - `billing_event` - closed set of typed events with per-variant decoders
//! - `webhook_verifier` - signature verification over the raw body
//! - `transition` - conditional transitions and their outcomes

mod billing_event;
mod payment;
mod stripe_event;
mod subscription;
mod transition;
mod webhook_errors;
mod webhook_verifier;

pub use billing_event::{
    concern_of, BillingConcern, BillingEvent, CheckoutCompleted, PaymentIntentOutcome,
    SubscriptionDeleted, CHECKOUT_SESSION_COMPLETED, PAYMENT_INTENT_FAILED,
    PAYMENT_INTENT_SUCCEEDED, SUBSCRIPTION_DELETED,
};
pub use payment::{PaymentRecord, PaymentStatus};
pub use stripe_event::{StripeEvent, StripeEventData};
pub use subscription::{SubscriptionRecord, SubscriptionStatus};
pub use transition::{ApplyOutcome, Transition};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{
    sign_payload, SignatureHeader, WebhookVerifier, DEFAULT_TOLERANCE_SECS,
};
