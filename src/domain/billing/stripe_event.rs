//! Stripe webhook event envelope.
//!
//! Only the envelope is parsed here; the `data.object` payload stays
//! untyped until a per-variant decoder in `billing_event` claims it.

use serde::{Deserialize, Serialize};

use super::webhook_errors::WebhookError;

/// Stripe webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    #[serde(default)]
    pub created: i64,

    /// Object containing event-specific data.
    pub data: StripeEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,

    /// API version used to render this event.
    #[serde(default)]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Parses a verified payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, WebhookError> {
        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        if event.id.is_empty() {
            return Err(WebhookError::ParseError("event id is empty".to_string()));
        }
        Ok(event)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(&self) -> Result<T, WebhookError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| WebhookError::InvalidPayload(format!("{}: {}", self.event_type, e)))
    }
}

/// Builder for creating test StripeEvent instances.
#[cfg(test)]
pub struct StripeEventBuilder {
    id: String,
    event_type: String,
    object: serde_json::Value,
}

#[cfg(test)]
impl StripeEventBuilder {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: event_type.into(),
            object: serde_json::json!({}),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn build(self) -> StripeEvent {
        StripeEvent {
            id: self.id,
            event_type: self.event_type,
            created: chrono::Utc::now().timestamp(),
            data: StripeEventData {
                object: self.object,
            },
            livemode: false,
            api_version: Some("2024-06-20".to_string()),
        }
    }
}
