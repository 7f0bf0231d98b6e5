//! Appointment handlers.
//!
//! ## Commands
//! - Creating an appointment (subscription required)
//! - Updating an appointment (ownership checked by the caller)
//! - Deleting an appointment
//!
//! ## Queries
//! - Listing appointments within the caller's scope

mod create_appointment;
mod delete_appointment;
mod list_appointments;
mod update_appointment;

// Commands
pub use create_appointment::{CreateAppointmentCommand, CreateAppointmentHandler};
pub use delete_appointment::{DeleteAppointmentCommand, DeleteAppointmentHandler};
pub use update_appointment::{UpdateAppointmentCommand, UpdateAppointmentHandler};

// Queries
pub use list_appointments::{ListAppointmentsHandler, ListAppointmentsQuery};
