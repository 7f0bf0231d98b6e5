//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, roles, and error types that form the
//! vocabulary of the Harmonia domain.

mod auth;
mod errors;
mod ids;
mod ownership;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, Principal, Role};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AppointmentId, EventId, SubjectId};
pub use ownership::{OwnedByParties, Ownership};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
