//! HTTP handlers for billing endpoints.
//!
//! Checkout and status handlers sit behind the authorization gate. The two
//! webhook handlers do not: they authenticate the processor by signature
//! and always answer in the processor's retry vocabulary.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Json, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use crate::adapters::http::error::{webhook_error_response, webhook_success, ApiError};
use crate::adapters::http::middleware::RequirePrincipal;
use crate::adapters::http::state::AppState;
use crate::application::handlers::{
    CreatePaymentCheckoutCommand, CreateSubscriptionCheckoutCommand, GetSubscriptionStatusQuery,
    StartProviderOnboardingCommand,
};
use crate::domain::billing::{BillingConcern, WebhookError};
use crate::domain::foundation::AppointmentId;

use super::dto::{
    PaymentCheckoutRequest, PaymentCheckoutResponse, ProviderOnboardingResponse,
    SubscriptionCheckoutRequest, SubscriptionCheckoutResponse, SubscriptionStatusResponse,
};

/// Header carrying `t=<unix>,v1=<hex>`.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

// ════════════════════════════════════════════════════════════════════════════════
// Checkout
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/v1/payments/checkout - Start paying for an appointment
pub async fn create_payment_checkout(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(request): Json<PaymentCheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = CreatePaymentCheckoutCommand {
        principal,
        appointment_id: AppointmentId::new(request.appointment_id),
        amount: request.amount,
        currency: request.currency,
    };

    let result = state.payment_checkout_handler().handle(cmd).await?;

    Ok(Json(PaymentCheckoutResponse {
        client_secret: result.client_secret,
    }))
}

/// POST /api/v1/subscriptions/checkout - Start a subscription checkout
pub async fn create_subscription_checkout(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(request): Json<SubscriptionCheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = CreateSubscriptionCheckoutCommand {
        principal,
        plan_id: request.plan_id,
    };

    let result = state.subscription_checkout_handler().handle(cmd).await?;

    Ok(Json(SubscriptionCheckoutResponse {
        checkout_url: result.checkout_url,
    }))
}

/// GET /api/v1/subscriptions/status - The caller's subscription state
pub async fn get_subscription_status(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<impl IntoResponse, ApiError> {
    let query = GetSubscriptionStatusQuery {
        user_id: principal.subject_id,
    };

    let result = state.subscription_status_handler().handle(query).await?;

    Ok(Json(SubscriptionStatusResponse {
        status: result.status,
        active: result.active,
    }))
}

/// POST /api/v1/payments/onboarding - Connect the calling provider for payouts
pub async fn start_provider_onboarding(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .provider_onboarding_handler()
        .handle(StartProviderOnboardingCommand { principal })
        .await?;

    Ok(Json(ProviderOnboardingResponse {
        account_id: result.account_id,
        onboarding_url: result.onboarding_url,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhooks
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/v1/payments/webhook
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    reconcile(&state, &headers, body, BillingConcern::Payments).await
}

/// POST /api/v1/subscriptions/webhook
pub async fn subscription_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    reconcile(&state, &headers, body, BillingConcern::Subscriptions).await
}

async fn reconcile(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
    concern: BillingConcern,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let err = WebhookError::UnreadableBody(rejection.body_text());
            tracing::warn!(error = %err, "Webhook body unreadable");
            return webhook_error_response(&err);
        }
    };

    // A non-ASCII header cannot be a valid signature; treat it as absent.
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match state.reconciler.handle(&body, signature, concern).await {
        Ok(outcome) => {
            tracing::debug!(outcome = %outcome, "Webhook acknowledged");
            webhook_success()
        }
        Err(e) => webhook_error_response(&e),
    }
}
