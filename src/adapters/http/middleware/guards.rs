//! Per-route guard middleware.
//!
//! Applied with `route_layer` so they only run for matched routes:
//!
//! ```ignore
//! put(update_appointment)
//!     .route_layer(from_fn_with_state(state.clone(), require_ownership))
//!     .route_layer(from_fn_with_state(RoleGuard::customers(), require_role))
//! ```
//!
//! The last `route_layer` runs first, so the role check precedes the
//! ownership lookup.

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};

use crate::adapters::http::error::ApiError;
use crate::adapters::http::state::AppState;
use crate::application::RoleGuard;
use crate::domain::foundation::{AppointmentId, ValidationError};

use super::auth::RequirePrincipal;

/// Rejects principals whose role is not in the guard's allow-list.
pub async fn require_role(
    State(guard): State<RoleGuard>,
    RequirePrincipal(principal): RequirePrincipal,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    guard.check(&principal)?;
    Ok(next.run(request).await)
}

/// Rejects principals that are not a party to the `:id` appointment.
pub async fn require_ownership(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let id: AppointmentId = id
        .parse()
        .map_err(|_| ValidationError::invalid_format("id", "must be an integer"))?;
    state.ownership_guard().check(&principal, id).await?;
    Ok(next.run(request).await)
}
