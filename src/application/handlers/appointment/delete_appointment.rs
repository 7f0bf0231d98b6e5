//! DeleteAppointmentHandler - Command handler for hard-deleting an appointment.

use std::sync::Arc;

use crate::domain::foundation::{AppointmentId, DomainError};
use crate::ports::AppointmentRepository;

/// Command to delete an appointment.
#[derive(Debug, Clone, Copy)]
pub struct DeleteAppointmentCommand {
    pub appointment_id: AppointmentId,
}

/// Handler for deleting appointments.
pub struct DeleteAppointmentHandler {
    repository: Arc<dyn AppointmentRepository>,
}

impl DeleteAppointmentHandler {
    pub fn new(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, cmd: DeleteAppointmentCommand) -> Result<(), DomainError> {
        self.repository.delete(cmd.appointment_id).await?;
        tracing::info!(appointment_id = %cmd.appointment_id, "Appointment deleted");
        Ok(())
    }
}
