//! Listing filters and pagination for appointments.

use chrono::NaiveDate;

use crate::domain::foundation::{Principal, Role, ValidationError};

use super::{Appointment, AppointmentStatus};

/// Default page size when the caller gives none (or an unusable one).
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Upper bound on a page.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Limit/offset pair, already normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Normalises raw query values. Non-positive limits fall back to the
    /// default, negative offsets to zero.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        };
        let offset = match offset {
            Some(o) if o >= 0 => o,
            _ => 0,
        };
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Filter composition for the listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub owner_id: Option<i64>,
    pub counterparty_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Page,
}

impl AppointmentFilter {
    /// Narrows the filter to what the principal is allowed to see.
    ///
    /// Customers see only appointments they own and providers only those
    /// booked with them; the caller-supplied column filter is overridden.
    /// Admins keep whatever they asked for.
    pub fn scoped_to(mut self, principal: &Principal) -> Result<Self, ValidationError> {
        match principal.role {
            Role::Customer => self.owner_id = Some(principal.subject_id.as_owner_id()?),
            Role::Provider => self.counterparty_id = Some(principal.subject_id.as_owner_id()?),
            Role::Admin => {}
        }
        Ok(self)
    }

    /// Evaluates the filter predicate (not the page) against a record.
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.status.map_or(true, |s| appointment.status == s)
            && self.owner_id.map_or(true, |id| appointment.owner_id == id)
            && self
                .counterparty_id
                .map_or(true, |id| appointment.counterparty_id == id)
            && self
                .start_date
                .map_or(true, |d| appointment.appointment_date >= d)
            && self
                .end_date
                .map_or(true, |d| appointment.appointment_date <= d)
    }
}
