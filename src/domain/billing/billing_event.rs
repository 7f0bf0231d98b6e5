//! Typed billing events.
//!
//! Each event type we act on has its own decoder over the envelope's
//! `data.object`. Anything else decodes to `Unsupported` and is
//! acknowledged without touching the store.

use serde::Deserialize;
use std::collections::HashMap;

use crate::domain::foundation::{AppointmentId, SubjectId};

use super::stripe_event::StripeEvent;
use super::webhook_errors::WebhookError;

pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_INTENT_FAILED: &str = "payment_intent.payment_failed";
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// Which record family an event concerns. Each webhook endpoint only
/// reconciles its own concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingConcern {
    Payments,
    Subscriptions,
}

/// A payment intent outcome for one appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentOutcome {
    pub payment_intent_id: String,
    pub appointment_id: AppointmentId,
}

/// A completed subscription checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCompleted {
    pub session_id: String,
    pub user_id: SubjectId,
    pub subscription_id: Option<String>,
    pub payment_status: String,
}

impl CheckoutCompleted {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// A subscription deleted at the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDeleted {
    pub subscription_id: String,
    /// Present when the checkout attached user metadata to the subscription.
    pub user_id: Option<SubjectId>,
}

/// Closed set of events the reconciler understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    PaymentSucceeded(PaymentIntentOutcome),
    PaymentFailed(PaymentIntentOutcome),
    CheckoutCompleted(CheckoutCompleted),
    SubscriptionDeleted(SubscriptionDeleted),
    Unsupported(String),
}

impl BillingEvent {
    /// Decodes the envelope's object according to its event type.
    ///
    /// # Errors
    ///
    /// `MissingMetadata` / `InvalidPayload` when a known event type carries
    /// an object without the fields it needs.
    pub fn decode(event: &StripeEvent) -> Result<Self, WebhookError> {
        match event.event_type.as_str() {
            PAYMENT_INTENT_SUCCEEDED => Ok(BillingEvent::PaymentSucceeded(
                decode_payment_intent(event)?,
            )),
            PAYMENT_INTENT_FAILED => Ok(BillingEvent::PaymentFailed(decode_payment_intent(
                event,
            )?)),
            CHECKOUT_SESSION_COMPLETED => Ok(BillingEvent::CheckoutCompleted(
                decode_checkout_session(event)?,
            )),
            SUBSCRIPTION_DELETED => Ok(BillingEvent::SubscriptionDeleted(decode_subscription(
                event,
            )?)),
            other => Ok(BillingEvent::Unsupported(other.to_string())),
        }
    }

    /// Returns the concern this event belongs to, if any.
    pub fn concern(&self) -> Option<BillingConcern> {
        match self {
            BillingEvent::PaymentSucceeded(_) | BillingEvent::PaymentFailed(_) => {
                Some(BillingConcern::Payments)
            }
            BillingEvent::CheckoutCompleted(_) | BillingEvent::SubscriptionDeleted(_) => {
                Some(BillingConcern::Subscriptions)
            }
            BillingEvent::Unsupported(_) => None,
        }
    }
}

/// Returns the concern implied by a raw event type, without decoding.
pub fn concern_of(event_type: &str) -> Option<BillingConcern> {
    match event_type {
        PAYMENT_INTENT_SUCCEEDED | PAYMENT_INTENT_FAILED => Some(BillingConcern::Payments),
        CHECKOUT_SESSION_COMPLETED | SUBSCRIPTION_DELETED => Some(BillingConcern::Subscriptions),
        _ => None,
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Per-variant decoders
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct PaymentIntentObject {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    id: String,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    subscription: Option<Expandable>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Stripe renders related objects either as an id or, when expanded, inline.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    fn into_id(self) -> String {
        match self {
            Expandable::Id(id) | Expandable::Object { id } => id,
        }
    }
}

fn decode_payment_intent(event: &StripeEvent) -> Result<PaymentIntentOutcome, WebhookError> {
    let intent: PaymentIntentObject = event.deserialize_object()?;
    let raw = intent
        .metadata
        .get("appointment_id")
        .ok_or(WebhookError::MissingMetadata("appointment_id"))?;
    let appointment_id = raw.parse::<AppointmentId>().map_err(|_| {
        WebhookError::InvalidPayload(format!("appointment_id '{}' is not an integer", raw))
    })?;

    Ok(PaymentIntentOutcome {
        payment_intent_id: intent.id,
        appointment_id,
    })
}

fn decode_checkout_session(event: &StripeEvent) -> Result<CheckoutCompleted, WebhookError> {
    let session: CheckoutSessionObject = event.deserialize_object()?;
    let user_id = session
        .metadata
        .get("user_id")
        .ok_or(WebhookError::MissingMetadata("user_id"))
        .and_then(|raw| {
            SubjectId::new(raw.as_str()).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
        })?;

    Ok(CheckoutCompleted {
        session_id: session.id,
        user_id,
        subscription_id: session.subscription.map(Expandable::into_id),
        payment_status: session.payment_status.unwrap_or_default(),
    })
}

fn decode_subscription(event: &StripeEvent) -> Result<SubscriptionDeleted, WebhookError> {
    let subscription: SubscriptionObject = event.deserialize_object()?;
    let user_id = subscription
        .metadata
        .get("user_id")
        .and_then(|raw| SubjectId::new(raw.as_str()).ok());

    Ok(SubscriptionDeleted {
        subscription_id: subscription.id,
        user_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::stripe_event::StripeEventBuilder;
    use serde_json::json;

    // ════════════════════════════════════════════════════════════════════════════
    // Payment intents
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn decodes_payment_succeeded() {
        let event = StripeEventBuilder::new(PAYMENT_INTENT_SUCCEEDED)
            .object(json!({"id": "pi_123", "metadata": {"appointment_id": "42"}}))
            .build();

        assert_eq!(
            BillingEvent::decode(&event).unwrap(),
            BillingEvent::PaymentSucceeded(PaymentIntentOutcome {
                payment_intent_id: "pi_123".to_string(),
                appointment_id: AppointmentId::new(42),
            })
        );
    }

    #[test]
    fn payment_without_appointment_metadata_is_missing_metadata() {
        let event = StripeEventBuilder::new(PAYMENT_INTENT_SUCCEEDED)
            .object(json!({"id": "pi_123", "metadata": {}}))
            .build();

        assert_eq!(
            BillingEvent::decode(&event),
            Err(WebhookError::MissingMetadata("appointment_id"))
        );
    }

    #[test]
    fn payment_with_non_numeric_appointment_is_invalid() {
        let event = StripeEventBuilder::new(PAYMENT_INTENT_FAILED)
            .object(json!({"id": "pi_123", "metadata": {"appointment_id": "abc"}}))
            .build();

        assert!(matches!(
            BillingEvent::decode(&event),
            Err(WebhookError::InvalidPayload(_))
        ));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout sessions
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn decodes_checkout_with_subscription_id_string() {
        let event = StripeEventBuilder::new(CHECKOUT_SESSION_COMPLETED)
            .object(json!({
                "id": "cs_1",
                "payment_status": "paid",
                "subscription": "sub_1",
                "metadata": {"user_id": "42"}
            }))
            .build();

        let BillingEvent::CheckoutCompleted(completed) = BillingEvent::decode(&event).unwrap() else {
            panic!("expected checkout completion");
        };
        assert_eq!(completed.session_id, "cs_1");
        assert_eq!(completed.user_id.as_str(), "42");
        assert_eq!(completed.subscription_id.as_deref(), Some("sub_1"));
        assert!(completed.is_paid());
    }

    #[test]
    fn decodes_checkout_with_expanded_subscription() {
        let event = StripeEventBuilder::new(CHECKOUT_SESSION_COMPLETED)
            .object(json!({
                "id": "cs_1",
                "payment_status": "unpaid",
                "subscription": {"id": "sub_9", "object": "subscription"},
                "metadata": {"user_id": "42"}
            }))
            .build();

        let BillingEvent::CheckoutCompleted(completed) = BillingEvent::decode(&event).unwrap() else {
            panic!("expected checkout completion");
        };
        assert_eq!(completed.subscription_id.as_deref(), Some("sub_9"));
        assert!(!completed.is_paid());
    }

    #[test]
    fn checkout_without_user_is_missing_metadata() {
        let event = StripeEventBuilder::new(CHECKOUT_SESSION_COMPLETED)
            .object(json!({"id": "cs_1", "payment_status": "paid"}))
            .build();

        assert_eq!(
            BillingEvent::decode(&event),
            Err(WebhookError::MissingMetadata("user_id"))
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscriptions and routing
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn decodes_subscription_deleted_with_optional_user() {
        let with_user = StripeEventBuilder::new(SUBSCRIPTION_DELETED)
            .object(json!({"id": "sub_1", "metadata": {"user_id": "42"}}))
            .build();
        let without_user = StripeEventBuilder::new(SUBSCRIPTION_DELETED)
            .object(json!({"id": "sub_1"}))
            .build();

        let BillingEvent::SubscriptionDeleted(a) = BillingEvent::decode(&with_user).unwrap() else {
            panic!("expected deletion");
        };
        let BillingEvent::SubscriptionDeleted(b) = BillingEvent::decode(&without_user).unwrap() else {
            panic!("expected deletion");
        };
        assert_eq!(a.user_id.map(|u| u.to_string()), Some("42".to_string()));
        assert!(b.user_id.is_none());
    }

    #[test]
    fn unknown_types_are_unsupported_not_errors() {
        let event = StripeEventBuilder::new("invoice.created")
            .object(json!("whatever"))
            .build();

        assert_eq!(
            BillingEvent::decode(&event).unwrap(),
            BillingEvent::Unsupported("invoice.created".to_string())
        );
    }

    #[test]
    fn concerns_partition_known_types() {
        assert_eq!(concern_of(PAYMENT_INTENT_SUCCEEDED), Some(BillingConcern::Payments));
        assert_eq!(concern_of(PAYMENT_INTENT_FAILED), Some(BillingConcern::Payments));
        assert_eq!(
            concern_of(CHECKOUT_SESSION_COMPLETED),
            Some(BillingConcern::Subscriptions)
        );
        assert_eq!(concern_of(SUBSCRIPTION_DELETED), Some(BillingConcern::Subscriptions));
        assert_eq!(concern_of("charge.refunded"), None);
    }
}
