//! ListAppointmentsHandler - Query handler for the appointment listing.

use std::sync::Arc;

use crate::domain::appointment::{Appointment, AppointmentFilter};
use crate::domain::foundation::{DomainError, Principal};
use crate::ports::AppointmentRepository;

/// Query to list appointments visible to the caller.
#[derive(Debug, Clone)]
pub struct ListAppointmentsQuery {
    pub principal: Principal,
    pub filter: AppointmentFilter,
}

/// Handler for listing appointments.
pub struct ListAppointmentsHandler {
    repository: Arc<dyn AppointmentRepository>,
}

impl ListAppointmentsHandler {
    pub fn new(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self { repository }
    }

    /// Lists appointments after narrowing the filter to the principal's scope.
    pub async fn handle(&self, query: ListAppointmentsQuery) -> Result<Vec<Appointment>, DomainError> {
        let filter = query.filter.scoped_to(&query.principal)?;
        self.repository.list(&filter).await
    }
}
