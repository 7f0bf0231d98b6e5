//! Route configuration for appointment endpoints.

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::adapters::http::middleware::{require_ownership, require_role};
use crate::adapters::http::state::AppState;
use crate::application::RoleGuard;
use crate::domain::foundation::Role;

use super::handlers::{create_appointment, delete_appointment, list_appointments, update_appointment};

/// Creates the appointment router, relative to `/api/v1`.
///
/// Routes:
/// - `GET /appointments` - any role
/// - `POST /appointments` - customers
/// - `PUT /appointments/:id` - any role, parties to the appointment only
/// - `DELETE /appointments/:id` - customers and admins, parties only
pub fn appointment_routes(state: AppState) -> Router<AppState> {
    let delete_guard = RoleGuard::new([Role::Customer, Role::Admin]);

    Router::new()
        .route(
            "/appointments",
            get(list_appointments)
                .route_layer(from_fn_with_state(RoleGuard::any(), require_role))
                .merge(
                    post(create_appointment)
                        .route_layer(from_fn_with_state(RoleGuard::customers(), require_role)),
                ),
        )
        .route(
            "/appointments/:id",
            put(update_appointment)
                .route_layer(from_fn_with_state(state.clone(), require_ownership))
                .route_layer(from_fn_with_state(RoleGuard::any(), require_role))
                .merge(
                    delete(delete_appointment)
                        .route_layer(from_fn_with_state(state, require_ownership))
                        .route_layer(from_fn_with_state(delete_guard, require_role)),
                ),
        )
}
