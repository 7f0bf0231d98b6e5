//! Error responses for the HTTP layer.
//!
//! Every failure reaches the client as `{"error_code": ..., "message": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::billing::WebhookError;
use crate::domain::foundation::{AuthError, DomainError, ErrorCode, ValidationError};

/// Standard error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }
}

/// Maps a domain error code to its HTTP status.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationFailed | ErrorCode::ProviderNotOnboarded => StatusCode::BAD_REQUEST,
        ErrorCode::AppointmentNotFound
        | ErrorCode::PaymentNotFound
        | ErrorCode::SubscriptionNotFound => StatusCode::NOT_FOUND,
        ErrorCode::InvalidStateTransition
        | ErrorCode::PaymentAlreadyCompleted
        | ErrorCode::SubscriptionAlreadyActive => StatusCode::CONFLICT,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden | ErrorCode::SubscriptionRequired => StatusCode::FORBIDDEN,
        ErrorCode::PaymentProviderError => StatusCode::BAD_GATEWAY,
        ErrorCode::DatabaseError | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// API error type that converts domain and auth errors to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    Auth(AuthError),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(err) => {
                if err.is_transient() {
                    tracing::warn!(error = %err, "Identity provider unavailable");
                } else {
                    tracing::debug!(error = %err, "Authentication rejected");
                }
                let body = ErrorResponse::new(ErrorCode::Unauthorized.to_string(), err.to_string());
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            }
            ApiError::Domain(err) => {
                let status = status_for(err.code);
                // Storage details stay in the logs.
                let message = if status.is_server_error() {
                    tracing::error!(code = %err.code, error = %err.message, "Request failed");
                    "Internal server error".to_string()
                } else {
                    err.message
                };
                let mut body = ErrorResponse::new(err.code.to_string(), message);
                if !err.details.is_empty() && !status.is_server_error() {
                    body.details = serde_json::to_value(&err.details).ok();
                }
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Webhook rejections keep the processor's retry contract: 4xx is final,
/// 5xx is redelivered.
pub fn webhook_error_response(err: &WebhookError) -> Response {
    let status = err.status_code();
    if status.is_success() {
        return webhook_success();
    }
    let code = if err.is_retryable() {
        "WEBHOOK_STORAGE_ERROR"
    } else if err.is_signature_failure() {
        "INVALID_SIGNATURE"
    } else {
        "INVALID_WEBHOOK"
    };
    (status, Json(ErrorResponse::new(code, err.to_string()))).into_response()
}

/// Acknowledgement body for every handled, ignored or duplicate event.
pub fn webhook_success() -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "success" }))).into_response()
}
