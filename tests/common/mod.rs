//! Shared harness for the integration tests: the full router over
//! in-memory stores, a mock identity provider and a mock processor.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use tower::ServiceExt;

use harmonia::adapters::auth::{MockIdentityVerifier, MockProfileResolver};
use harmonia::adapters::http::{build_router, AppState, HttpSettings};
use harmonia::adapters::memory::{InMemoryAppointmentRepository, InMemoryBillingStore};
use harmonia::adapters::stripe::MockPaymentProvider;
use harmonia::application::handlers::{
    PaymentCheckoutSettings, ProviderOnboardingSettings, SubscriptionCheckoutSettings,
};
use harmonia::application::{AuthorizationGate, BillingStateReconciler};
use harmonia::domain::billing::{sign_payload, WebhookVerifier};
use harmonia::domain::foundation::Role;

pub const WEBHOOK_SECRET: &str = "whsec_integration";

/// Subjects known to the mock identity provider. The bearer token for a
/// subject is `tok_<subject>`.
pub const SUBJECTS: &[(&str, Role)] = &[
    ("7", Role::Customer),
    ("8", Role::Customer),
    ("42", Role::Customer),
    ("30", Role::Provider),
    ("1", Role::Admin),
];

pub fn token(subject: &str) -> String {
    format!("tok_{}", subject)
}

pub struct Harness {
    pub router: Router,
    pub appointments: Arc<InMemoryAppointmentRepository>,
    pub billing: Arc<InMemoryBillingStore>,
    pub payments: Arc<MockPaymentProvider>,
}

impl Harness {
    pub fn new() -> Self {
        let mut verifier = MockIdentityVerifier::new();
        let mut resolver = MockProfileResolver::new();
        for (subject, role) in SUBJECTS {
            verifier = verifier.with_token(token(subject), *subject);
            resolver = resolver.with_profile(*subject, &format!("{}@example.com", subject), *role);
        }

        let appointments = Arc::new(InMemoryAppointmentRepository::new());
        let billing = Arc::new(InMemoryBillingStore::new().with_provider_account(30, "acct_30"));
        let payments = Arc::new(MockPaymentProvider::new());

        let state = AppState {
            gate: AuthorizationGate::new(
                Arc::new(verifier),
                Arc::new(resolver),
                Duration::from_secs(1),
            ),
            appointments: appointments.clone(),
            billing: billing.clone(),
            subscriptions: billing.clone(),
            payments: payments.clone(),
            reconciler: Arc::new(BillingStateReconciler::new(
                WebhookVerifier::new(WEBHOOK_SECRET),
                billing.clone(),
            )),
            payment_checkout: PaymentCheckoutSettings {
                default_currency: "usd".to_string(),
                platform_fee_percent: 10,
            },
            subscription_checkout: SubscriptionCheckoutSettings {
                success_url: "https://app.example.com/ok".to_string(),
                cancel_url: "https://app.example.com/cancel".to_string(),
            },
            provider_onboarding: ProviderOnboardingSettings {
                country: "US".to_string(),
                refresh_url: "https://app.example.com/onboarding/retry".to_string(),
                return_url: "https://app.example.com/onboarding/done".to_string(),
            },
        };

        Self {
            router: build_router(state, &HttpSettings::default()),
            appointments,
            billing,
            payments,
        }
    }

    /// Sends a JSON request as `subject` (or anonymously).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        subject: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (u16, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(subject) = subject {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(subject)));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        into_parts(self.router.clone().oneshot(request).await.unwrap()).await
    }

    /// Delivers a webhook with an explicit body and signature header.
    pub async fn deliver_raw(
        &self,
        path: &str,
        payload: Vec<u8>,
        signature: Option<String>,
    ) -> (u16, serde_json::Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header("Stripe-Signature", signature);
        }
        let request = builder.body(Body::from(payload)).unwrap();
        into_parts(self.router.clone().oneshot(request).await.unwrap()).await
    }

    /// Delivers a correctly signed webhook.
    pub async fn deliver(&self, path: &str, event: &serde_json::Value) -> (u16, serde_json::Value) {
        let payload = serde_json::to_vec(event).unwrap();
        let signature = sign_payload(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), &payload);
        self.deliver_raw(path, payload, Some(signature)).await
    }
}

async fn into_parts(response: Response<Body>) -> (u16, serde_json::Value) {
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

// =============================================================================
// Event builders
// =============================================================================

pub const PAYMENTS_WEBHOOK: &str = "/api/v1/payments/webhook";
pub const SUBSCRIPTIONS_WEBHOOK: &str = "/api/v1/subscriptions/webhook";

fn event(id: &str, event_type: &str, object: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "type": event_type,
        "created": 1_700_000_000,
        "data": { "object": object }
    })
}

pub fn checkout_completed(id: &str, session: &str, user: &str, subscription: &str) -> serde_json::Value {
    event(
        id,
        "checkout.session.completed",
        serde_json::json!({
            "id": session,
            "subscription": subscription,
            "payment_status": "paid",
            "metadata": { "user_id": user }
        }),
    )
}

pub fn subscription_deleted(id: &str, subscription: &str, user: &str) -> serde_json::Value {
    event(
        id,
        "customer.subscription.deleted",
        serde_json::json!({ "id": subscription, "metadata": { "user_id": user } }),
    )
}

pub fn payment_succeeded(id: &str, intent: &str, appointment_id: i64) -> serde_json::Value {
    event(
        id,
        "payment_intent.succeeded",
        serde_json::json!({
            "id": intent,
            "metadata": { "appointment_id": appointment_id.to_string() }
        }),
    )
}

pub fn booking(counterparty: i64) -> serde_json::Value {
    serde_json::json!({
        "masseurId": counterparty,
        "appointmentDate": "2025-06-02",
        "startTime": "09:00:00",
        "endTime": "10:00:00",
        "appointmentType": "sports"
    })
}
