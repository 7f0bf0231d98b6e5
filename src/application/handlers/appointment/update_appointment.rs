//! UpdateAppointmentHandler - Command handler for replacing appointment fields.
//!
//! Ownership is checked before this handler runs (see `OwnershipGuard`).
//! A provider may edit their booking but never hand it to another provider.

use std::sync::Arc;

use crate::domain::appointment::{Appointment, AppointmentDraft};
use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode, Principal, Role};
use crate::ports::AppointmentRepository;

/// Command to replace the editable fields of an appointment.
#[derive(Debug, Clone)]
pub struct UpdateAppointmentCommand {
    pub principal: Principal,
    pub appointment_id: AppointmentId,
    pub draft: AppointmentDraft,
}

/// Handler for updating appointments.
pub struct UpdateAppointmentHandler {
    repository: Arc<dyn AppointmentRepository>,
}

impl UpdateAppointmentHandler {
    pub fn new(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, cmd: UpdateAppointmentCommand) -> Result<Appointment, DomainError> {
        cmd.draft.validate()?;

        let current = self
            .repository
            .find_by_id(cmd.appointment_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::AppointmentNotFound,
                    format!("Appointment not found: {}", cmd.appointment_id),
                )
            })?;

        if cmd.principal.role == Role::Provider
            && cmd.draft.counterparty_id != current.counterparty_id
        {
            tracing::warn!(
                appointment_id = %cmd.appointment_id,
                "Provider attempted to reassign appointment"
            );
            return Err(DomainError::forbidden(
                "Providers cannot reassign an appointment",
            ));
        }

        let revised = current.revise(cmd.draft);
        self.repository.update(&revised).await?;

        tracing::info!(appointment_id = %revised.id, "Appointment updated");
        Ok(revised)
    }
}
