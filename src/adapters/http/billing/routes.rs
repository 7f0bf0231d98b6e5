//! Route configuration for billing endpoints.

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use crate::adapters::http::middleware::require_role;
use crate::adapters::http::state::AppState;
use crate::application::RoleGuard;
use crate::domain::foundation::Role;

use super::handlers::{
    create_payment_checkout, create_subscription_checkout, get_subscription_status,
    payment_webhook, start_provider_onboarding, subscription_webhook,
};

/// Authenticated billing routes, relative to `/api/v1`.
///
/// Routes:
/// - `POST /payments/checkout` - customers
/// - `POST /payments/onboarding` - providers
/// - `POST /subscriptions/checkout` - customers
/// - `GET /subscriptions/status` - any role
pub fn billing_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/payments/checkout",
            post(create_payment_checkout)
                .route_layer(from_fn_with_state(RoleGuard::customers(), require_role)),
        )
        .route(
            "/payments/onboarding",
            post(start_provider_onboarding)
                .route_layer(from_fn_with_state(RoleGuard::new([Role::Provider]), require_role)),
        )
        .route(
            "/subscriptions/checkout",
            post(create_subscription_checkout)
                .route_layer(from_fn_with_state(RoleGuard::customers(), require_role)),
        )
        .route(
            "/subscriptions/status",
            get(get_subscription_status)
                .route_layer(from_fn_with_state(RoleGuard::any(), require_role)),
        )
}

/// Processor webhooks, relative to `/api/v1`. Must stay outside the gate.
///
/// Routes:
/// - `POST /payments/webhook`
/// - `POST /subscriptions/webhook`
pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/payments/webhook", post(payment_webhook))
        .route("/subscriptions/webhook", post(subscription_webhook))
}
