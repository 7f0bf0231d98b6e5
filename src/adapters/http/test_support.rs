//! Router harness for HTTP tests: in-memory stores, mock identity provider,
//! mock payment processor.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;

use crate::adapters::auth::{MockIdentityVerifier, MockProfileResolver};
use crate::adapters::memory::{InMemoryAppointmentRepository, InMemoryBillingStore};
use crate::adapters::stripe::MockPaymentProvider;
use crate::application::handlers::{
    PaymentCheckoutSettings, ProviderOnboardingSettings, SubscriptionCheckoutSettings,
};
use crate::application::{AuthorizationGate, BillingStateReconciler};
use crate::domain::billing::{Transition, WebhookVerifier};
use crate::domain::foundation::{EventId, Role, SubjectId};
use crate::ports::{BillingStore, PendingSubscription};

use super::router::{build_router, HttpSettings};
use super::state::AppState;

pub(crate) const WEBHOOK_SECRET: &str = "whsec_test";

pub(crate) struct TestApp {
    pub state: AppState,
    pub appointments: Arc<InMemoryAppointmentRepository>,
    pub billing: Arc<InMemoryBillingStore>,
    pub payments: Arc<MockPaymentProvider>,
}

impl TestApp {
    pub const CUSTOMER_7: &'static str = "tok_customer_7";
    pub const CUSTOMER_8: &'static str = "tok_customer_8";
    pub const PROVIDER_30: &'static str = "tok_provider_30";
    pub const ADMIN_1: &'static str = "tok_admin_1";

    pub fn new() -> Self {
        Self::with_billing(InMemoryBillingStore::new().with_provider_account(30, "acct_30"))
    }

    pub fn with_billing(billing: InMemoryBillingStore) -> Self {
        let verifier = MockIdentityVerifier::new()
            .with_token(Self::CUSTOMER_7, "7")
            .with_token(Self::CUSTOMER_8, "8")
            .with_token(Self::PROVIDER_30, "30")
            .with_token(Self::ADMIN_1, "1");
        let resolver = MockProfileResolver::new()
            .with_profile("7", "seven@example.com", Role::Customer)
            .with_profile("8", "eight@example.com", Role::Customer)
            .with_profile("30", "thirty@example.com", Role::Provider)
            .with_profile("1", "admin@example.com", Role::Admin);

        let appointments = Arc::new(InMemoryAppointmentRepository::new());
        let billing = Arc::new(billing);
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
            state,
            appointments,
            billing,
            payments,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &HttpSettings::default())
    }

    /// Drives a user's subscription to `active` through the store.
    pub async fn activate_subscription(&self, user: &str) {
        let user_id = SubjectId::new(user).unwrap();
        let session_id = format!("cs_{}", user);
        self.billing
            .upsert_pending_subscription(&PendingSubscription {
                user_id: user_id.clone(),
                external_session_id: session_id.clone(),
                plan_id: "price_x".to_string(),
            })
            .await
            .unwrap();
        self.billing
            .apply(
                &EventId::new(format!("evt_activate_{}", user)).unwrap(),
                &Transition::ActivateSubscription {
                    user_id,
                    session_id,
                    subscription_id: Some(format!("sub_{}", user)),
                },
            )
            .await
            .unwrap();
    }
}

pub(crate) fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub(crate) async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
