//! Shared application state for the HTTP layer.

use std::sync::Arc;

use crate::application::handlers::{
    CreateAppointmentHandler, CreatePaymentCheckoutHandler, CreateSubscriptionCheckoutHandler,
    DeleteAppointmentHandler, GetSubscriptionStatusHandler, ListAppointmentsHandler,
    PaymentCheckoutSettings, ProviderOnboardingSettings, StartProviderOnboardingHandler,
    SubscriptionCheckoutSettings, UpdateAppointmentHandler,
};
use crate::application::{
    AuthorizationGate, BillingStateReconciler, OwnershipGuard, SubscriptionGuard,
};
use crate::ports::{AppointmentRepository, BillingStore, PaymentProvider, SubscriptionReader};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every dependency is Arc-wrapped. `subscriptions`
/// is normally the same store as `billing`, seen through its read-only port.
#[derive(Clone)]
pub struct AppState {
    pub gate: AuthorizationGate,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub billing: Arc<dyn BillingStore>,
    pub subscriptions: Arc<dyn SubscriptionReader>,
    pub payments: Arc<dyn PaymentProvider>,
    pub reconciler: Arc<BillingStateReconciler>,
    pub payment_checkout: PaymentCheckoutSettings,
    pub subscription_checkout: SubscriptionCheckoutSettings,
    pub provider_onboarding: ProviderOnboardingSettings,
}

impl AppState {
    // Guards

    pub fn ownership_guard(&self) -> OwnershipGuard {
        OwnershipGuard::new(self.appointments.clone())
    }

    pub fn subscription_guard(&self) -> SubscriptionGuard {
        SubscriptionGuard::new(self.subscriptions.clone())
    }

    // Appointment handlers

    pub fn list_appointments_handler(&self) -> ListAppointmentsHandler {
        ListAppointmentsHandler::new(self.appointments.clone())
    }

    pub fn create_appointment_handler(&self) -> CreateAppointmentHandler {
        CreateAppointmentHandler::new(self.appointments.clone(), self.subscription_guard())
    }

    pub fn update_appointment_handler(&self) -> UpdateAppointmentHandler {
        UpdateAppointmentHandler::new(self.appointments.clone())
    }

    pub fn delete_appointment_handler(&self) -> DeleteAppointmentHandler {
        DeleteAppointmentHandler::new(self.appointments.clone())
    }

    // Billing handlers

    pub fn payment_checkout_handler(&self) -> CreatePaymentCheckoutHandler {
        CreatePaymentCheckoutHandler::new(
            self.appointments.clone(),
            self.billing.clone(),
            self.payments.clone(),
            self.payment_checkout.clone(),
        )
    }

    pub fn subscription_checkout_handler(&self) -> CreateSubscriptionCheckoutHandler {
        CreateSubscriptionCheckoutHandler::new(
            self.billing.clone(),
            self.payments.clone(),
            self.subscription_checkout.clone(),
        )
    }

    pub fn provider_onboarding_handler(&self) -> StartProviderOnboardingHandler {
        StartProviderOnboardingHandler::new(
            self.billing.clone(),
            self.payments.clone(),
            self.provider_onboarding.clone(),
        )
    }

    pub fn subscription_status_handler(&self) -> GetSubscriptionStatusHandler {
        GetSubscriptionStatusHandler::new(self.subscriptions.clone())
    }
}
