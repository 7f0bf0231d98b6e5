//! HTTP adapter - axum REST API.
//!
//! - `middleware` - authorization gate and per-route guards
//! - `appointment` / `billing` - DTOs, handlers and routes per area
//! - `state` - shared `AppState` and handler factories
//! - `router` - top-level router and tower-http layers
//! - `error` - JSON error bodies and status mapping

pub mod appointment;
pub mod billing;
pub mod error;
pub mod middleware;
mod router;
mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ApiError, ErrorResponse};
pub use router::{build_router, HttpSettings};
pub use state::AppState;
