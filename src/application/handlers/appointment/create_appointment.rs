//! CreateAppointmentHandler - Command handler for booking an appointment.

use std::sync::Arc;

use crate::application::guards::SubscriptionGuard;
use crate::domain::appointment::{Appointment, AppointmentDraft};
use crate::domain::foundation::{DomainError, Principal, Timestamp};
use crate::ports::AppointmentRepository;

/// Command to create an appointment owned by the caller.
#[derive(Debug, Clone)]
pub struct CreateAppointmentCommand {
    pub principal: Principal,
    pub draft: AppointmentDraft,
}

/// Handler for creating appointments.
///
/// Booking requires an active subscription; the owner is always the caller.
pub struct CreateAppointmentHandler {
    repository: Arc<dyn AppointmentRepository>,
    subscription_guard: SubscriptionGuard,
}

impl CreateAppointmentHandler {
    pub fn new(
        repository: Arc<dyn AppointmentRepository>,
        subscription_guard: SubscriptionGuard,
    ) -> Self {
        Self {
            repository,
            subscription_guard,
        }
    }

    pub async fn handle(&self, cmd: CreateAppointmentCommand) -> Result<Appointment, DomainError> {
        // 1. Subscription gate (fails closed)
        self.subscription_guard
            .require_active(&cmd.principal.subject_id)
            .await?;

        // 2. Owner comes from the credential, never the body
        let owner_id = cmd.principal.subject_id.as_owner_id()?;

        // 3. Field invariants
        cmd.draft.validate()?;

        // 4. Persist
        let appointment = self
            .repository
            .create(owner_id, cmd.draft, Timestamp::now())
            .await?;

        tracing::info!(
            appointment_id = %appointment.id,
            owner_id,
            counterparty_id = appointment.counterparty_id,
            "Appointment created"
        );

        Ok(appointment)
    }
}
