//! Webhook error types for Stripe webhook handling.
//!
//! Status codes determine the processor's retry behavior, so the mapping
//! here is part of the contract:
//! - 2xx: acknowledged, no retry
//! - 4xx: rejected permanently
//! - 5xx: retried later

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook processing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// No `Stripe-Signature` header on the request.
    #[error("Missing signature header")]
    MissingSignature,

    /// Signature header present but not of the form `t=..,v1=..`.
    #[error("Malformed signature header: {0}")]
    MalformedSignatureHeader(String),

    /// No v1 signature in the header matches the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp is older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signed timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Request body could not be read.
    #[error("Unreadable body: {0}")]
    UnreadableBody(String),

    /// Verified payload is not a well-formed event envelope.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required metadata key missing from the event object.
    #[error("Missing metadata: {0}")]
    MissingMetadata(&'static str),

    /// Event object does not have the shape its type promises.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Billing store failed; nothing was committed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WebhookError {
    /// Returns true for failures of the signature check itself.
    pub fn is_signature_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature
                | WebhookError::MalformedSignatureHeader(_)
                | WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    /// Returns true if the processor should redeliver this event.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Storage(_))
    }

    /// Maps the error to an HTTP status code.
    ///
    /// A verified event whose object cannot be decoded is permanently
    /// unprocessable, so it is acknowledged rather than rejected.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature
            | WebhookError::MalformedSignatureHeader(_)
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::UnreadableBody(_)
            | WebhookError::ParseError(_) => StatusCode::BAD_REQUEST,

            WebhookError::MissingMetadata(_) | WebhookError::InvalidPayload(_) => StatusCode::OK,

            WebhookError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
