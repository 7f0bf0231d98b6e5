//! In-memory adapters for tests and database-free local runs.

mod appointment_repository;
mod billing_store;

pub use appointment_repository::InMemoryAppointmentRepository;
pub use billing_store::InMemoryBillingStore;
