//! Appointment repository port.
//!
//! Thin persistence for appointments. The only logic here is filter
//! composition, which lives on `AppointmentFilter`.

use async_trait::async_trait;

use crate::domain::appointment::{Appointment, AppointmentDraft, AppointmentFilter};
use crate::domain::foundation::{AppointmentId, DomainError, Ownership, Timestamp};

/// Repository port for appointments.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Lists appointments matching the filter, newest date first, paged.
    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, DomainError>;

    /// Find an appointment by id.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>, DomainError>;

    /// Fetches only the parties of an appointment, for ownership checks.
    async fn find_ownership(&self, id: AppointmentId) -> Result<Option<Ownership>, DomainError>;

    /// Inserts a new appointment and returns it with its assigned id.
    async fn create(
        &self,
        owner_id: i64,
        draft: AppointmentDraft,
        created_at: Timestamp,
    ) -> Result<Appointment, DomainError>;

    /// Persists the mutable fields of an existing appointment.
    ///
    /// # Errors
    ///
    /// - `AppointmentNotFound` if the row is gone
    async fn update(&self, appointment: &Appointment) -> Result<(), DomainError>;

    /// Hard-deletes an appointment.
    ///
    /// # Errors
    ///
    /// - `AppointmentNotFound` if the row is gone
    async fn delete(&self, id: AppointmentId) -> Result<(), DomainError>;
}
