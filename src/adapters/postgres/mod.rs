//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresAppointmentRepository` - Appointment persistence
//! - `PostgresBillingStore` - Payment/subscription records and processed events

mod appointment_repository;
mod billing_store;

pub use appointment_repository::PostgresAppointmentRepository;
pub use billing_store::PostgresBillingStore;
