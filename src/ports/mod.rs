//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Identity Ports
//!
//! - `IdentityVerifier` - Bearer token verification against the identity provider
//! - `ProfileResolver` - Directory lookup of email and role
//!
//! ## Storage Ports
//!
//! - `AppointmentRepository` - Appointment persistence
//! - `BillingStore` - Payment/subscription records and the processed-event log
//! - `SubscriptionReader` - Read-only subscription view for access checks
//!
//! ## External Service Ports
//!
//! - `PaymentProvider` - Payment intents, subscription checkout sessions and
//!   provider payout onboarding

mod appointment_repository;
mod billing_store;
mod identity_verifier;
mod payment_provider;
mod profile_resolver;

pub use appointment_repository::AppointmentRepository;
pub use billing_store::{BillingStore, PendingPayment, PendingSubscription, SubscriptionReader};
pub use identity_verifier::IdentityVerifier;
pub use payment_provider::{
    CheckoutSession, ConnectedAccount, CreateCheckoutRequest, CreateConnectedAccountRequest,
    CreateOnboardingLinkRequest, CreatePaymentIntentRequest, OnboardingLink, PaymentError,
    PaymentErrorCode, PaymentIntent, PaymentProvider,
};
pub use profile_resolver::{Profile, ProfileResolver};
