//! OwnershipGuard - checks the principal is a party to an appointment.

use std::sync::Arc;

use crate::domain::foundation::{
    AppointmentId, DomainError, ErrorCode, OwnedByParties, Principal,
};
use crate::ports::AppointmentRepository;

/// Fetches an appointment's ownership columns and checks them against the
/// principal (see `OwnedByParties::is_party` for the per-role rule).
#[derive(Clone)]
pub struct OwnershipGuard {
    repository: Arc<dyn AppointmentRepository>,
}

impl OwnershipGuard {
    pub fn new(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self { repository }
    }

    /// # Errors
    ///
    /// - `AppointmentNotFound` if the appointment does not exist
    /// - `Forbidden` if the principal is not a party to it
    pub async fn check(&self, principal: &Principal, id: AppointmentId) -> Result<(), DomainError> {
        let ownership = self.repository.find_ownership(id).await?.ok_or_else(|| {
            DomainError::new(
                ErrorCode::AppointmentNotFound,
                format!("Appointment not found: {}", id),
            )
        })?;

        ownership.check_ownership(principal).map_err(|e| {
            tracing::info!(
                appointment_id = %id,
                subject_id = %principal.subject_id,
                role = %principal.role,
                "Ownership check failed"
            );
            e
        })
    }
}
