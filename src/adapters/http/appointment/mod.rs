//! HTTP adapter for appointment endpoints.
//!
//! - `GET /api/v1/appointments` - List (scoped to the caller)
//! - `POST /api/v1/appointments` - Create (customers with an active subscription)
//! - `PUT /api/v1/appointments/:id` - Update (any role, parties only)
//! - `DELETE /api/v1/appointments/:id` - Delete (customers and admins, parties only)

pub mod dto;
mod handlers;
mod routes;

pub use dto::*;
pub use handlers::{create_appointment, delete_appointment, list_appointments, update_appointment};
pub use routes::appointment_routes;
