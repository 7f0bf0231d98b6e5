//! CreatePaymentCheckoutHandler - starts payment for an appointment.
//!
//! Creates a destination-charge payment intent at the processor and writes
//! the `pending` payment record that the reconciler later moves to `paid`.

use std::sync::Arc;

use crate::domain::foundation::{
    AppointmentId, DomainError, ErrorCode, OwnedByParties, Principal, ValidationError,
};
use crate::domain::billing::PaymentStatus;
use crate::ports::{
    AppointmentRepository, BillingStore, CreatePaymentIntentRequest, PaymentProvider,
    PendingPayment,
};

/// Platform fee for an amount, rounded down.
pub fn application_fee(amount: i64, fee_percent: u8) -> Result<i64, ValidationError> {
    amount
        .checked_mul(i64::from(fee_percent))
        .map(|v| v / 100)
        .ok_or_else(|| ValidationError::out_of_range("amount", 1, i64::MAX / 100, amount))
}

/// Settings shared by every payment checkout.
#[derive(Debug, Clone)]
pub struct PaymentCheckoutSettings {
    pub default_currency: String,
    pub platform_fee_percent: u8,
}

/// Command to start paying for an appointment.
#[derive(Debug, Clone)]
pub struct CreatePaymentCheckoutCommand {
    pub principal: Principal,
    pub appointment_id: AppointmentId,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: Option<String>,
}

/// Result of a payment checkout.
#[derive(Debug, Clone)]
pub struct CreatePaymentCheckoutResult {
    pub payment_intent_id: String,
    pub client_secret: String,
}

/// Handler for payment checkouts.
pub struct CreatePaymentCheckoutHandler {
    appointments: Arc<dyn AppointmentRepository>,
    store: Arc<dyn BillingStore>,
    provider: Arc<dyn PaymentProvider>,
    settings: PaymentCheckoutSettings,
}

impl CreatePaymentCheckoutHandler {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        store: Arc<dyn BillingStore>,
        provider: Arc<dyn PaymentProvider>,
        settings: PaymentCheckoutSettings,
    ) -> Self {
        Self {
            appointments,
            store,
            provider,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreatePaymentCheckoutCommand,
    ) -> Result<CreatePaymentCheckoutResult, DomainError> {
        // 1. Validate input
        if cmd.amount <= 0 {
            return Err(ValidationError::out_of_range("amount", 1, i64::MAX, cmd.amount).into());
        }
        let currency = normalize_currency(cmd.currency.as_deref(), &self.settings.default_currency)?;
        let fee = application_fee(cmd.amount, self.settings.platform_fee_percent)?;

        // 2. Appointment must exist and belong to the caller
        let appointment = self
            .appointments
            .find_by_id(cmd.appointment_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::AppointmentNotFound,
                    format!("Appointment not found: {}", cmd.appointment_id),
                )
            })?;
        appointment.check_ownership(&cmd.principal)?;

        // 3. Already paid appointments are not charged again
        if let Some(existing) = self.store.find_payment(cmd.appointment_id).await? {
            if existing.status == PaymentStatus::Paid {
                return Err(already_paid(cmd.appointment_id));
            }
        }

        // 4. Provider must be able to receive the transfer
        let destination = self
            .store
            .provider_account(appointment.counterparty_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ProviderNotOnboarded,
                    "Provider has not completed payout onboarding",
                )
                .with_detail("provider_id", appointment.counterparty_id.to_string())
            })?;

        // 5. Create the intent, then record it as pending
        let intent = self
            .provider
            .create_payment_intent(CreatePaymentIntentRequest {
                appointment_id: cmd.appointment_id,
                amount: cmd.amount,
                currency: currency.clone(),
                application_fee_amount: fee,
                destination_account: destination,
            })
            .await?;

        self.store
            .upsert_pending_payment(&PendingPayment {
                appointment_id: cmd.appointment_id,
                amount: cmd.amount,
                currency,
                external_payment_id: intent.id.clone(),
            })
            .await?;

        tracing::info!(
            appointment_id = %cmd.appointment_id,
            payment_intent_id = %intent.id,
            amount = cmd.amount,
            fee,
            "Payment checkout started"
        );

        Ok(CreatePaymentCheckoutResult {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
        })
    }
}

fn already_paid(id: AppointmentId) -> DomainError {
    DomainError::new(
        ErrorCode::PaymentAlreadyCompleted,
        format!("Appointment {} is already paid", id),
    )
}

fn normalize_currency(requested: Option<&str>, default: &str) -> Result<String, ValidationError> {
    let currency = requested.unwrap_or(default).trim().to_ascii_lowercase();
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_lowercase()) {
        Ok(currency)
    } else {
        Err(ValidationError::invalid_format(
            "currency",
            "expected a three-letter ISO currency code",
        ))
    }
}
