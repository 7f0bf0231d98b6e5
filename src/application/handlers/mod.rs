//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod appointment;
pub mod billing;

pub use appointment::{
    CreateAppointmentCommand, CreateAppointmentHandler, DeleteAppointmentCommand,
    DeleteAppointmentHandler, ListAppointmentsHandler, ListAppointmentsQuery,
    UpdateAppointmentCommand, UpdateAppointmentHandler,
};
pub use billing::{
    application_fee, CreatePaymentCheckoutCommand, CreatePaymentCheckoutHandler,
    CreatePaymentCheckoutResult, CreateSubscriptionCheckoutCommand,
    CreateSubscriptionCheckoutHandler, CreateSubscriptionCheckoutResult,
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, GetSubscriptionStatusResult,
    PaymentCheckoutSettings, ProviderOnboardingSettings, StartProviderOnboardingCommand,
    StartProviderOnboardingHandler, StartProviderOnboardingResult, SubscriptionCheckoutSettings,
};
