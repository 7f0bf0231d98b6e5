//! HTTP handlers for appointment endpoints.
//!
//! Role and ownership checks run as route middleware before these
//! handlers; see `routes.rs`.

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequirePrincipal;
use crate::adapters::http::state::AppState;
use crate::application::handlers::{
    CreateAppointmentCommand, DeleteAppointmentCommand, ListAppointmentsQuery,
    UpdateAppointmentCommand,
};
use crate::domain::foundation::AppointmentId;

use super::dto::{AppointmentRequest, AppointmentResponse, ListAppointmentsParams, MessageResponse};

/// GET /api/v1/appointments - List appointments visible to the caller
pub async fn list_appointments(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Query(params): Query<ListAppointmentsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = ListAppointmentsQuery {
        principal,
        filter: params.into_filter()?,
    };

    let appointments = state.list_appointments_handler().handle(query).await?;

    let response: Vec<AppointmentResponse> =
        appointments.into_iter().map(AppointmentResponse::from).collect();
    Ok(Json(response))
}

/// POST /api/v1/appointments - Book an appointment (subscribed customers)
pub async fn create_appointment(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(request): Json<AppointmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = CreateAppointmentCommand {
        principal,
        draft: request.into(),
    };

    let appointment = state.create_appointment_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(AppointmentResponse::from(appointment))))
}

/// PUT /api/v1/appointments/:id - Replace an appointment's editable fields
pub async fn update_appointment(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<i64>,
    Json(request): Json<AppointmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = UpdateAppointmentCommand {
        principal,
        appointment_id: AppointmentId::new(id),
        draft: request.into(),
    };

    let appointment = state.update_appointment_handler().handle(cmd).await?;

    Ok(Json(AppointmentResponse::from(appointment)))
}

/// DELETE /api/v1/appointments/:id - Delete an appointment
pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = DeleteAppointmentCommand {
        appointment_id: AppointmentId::new(id),
    };

    state.delete_appointment_handler().handle(cmd).await?;

    Ok(Json(MessageResponse::new("Appointment deleted successfully")))
}
