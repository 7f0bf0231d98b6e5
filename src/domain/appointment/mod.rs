//! Appointment domain - bookings between customers and providers.

mod appointment;
mod filter;
mod status;

pub use appointment::{Appointment, AppointmentDraft};
pub use filter::{AppointmentFilter, Page, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use status::AppointmentStatus;

#[cfg(test)]
pub(crate) use appointment::test_draft;
