//! Top-level router and the tower-http layer stack.

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::appointment::appointment_routes;
use super::billing::{billing_routes, webhook_routes};
use super::middleware::auth_middleware;
use super::state::AppState;

/// Settings for the outer layer stack.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Request-scoped deadline; exceeded requests get 408.
    pub request_timeout: Duration,
    /// Allowed browser origins. Empty disables CORS, `*` allows any.
    pub cors_origins: Vec<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
        }
    }
}

/// Builds the complete application router.
///
/// ```text
/// GET  /health
/// /api/v1/appointments...        ┐
/// /api/v1/payments/checkout      ├─ auth_middleware
/// /api/v1/subscriptions/...      ┘
/// POST /api/v1/*/webhook         ── signature verified, no gate
/// ```
pub fn build_router(state: AppState, settings: &HttpSettings) -> Router {
    let gated = Router::new()
        .merge(appointment_routes(state.clone()))
        .merge(billing_routes())
        .route_layer(from_fn_with_state(state.gate.clone(), auth_middleware));

    let api = gated.merge(webhook_routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(TimeoutLayer::new(settings.request_timeout))
        .layer(cors_layer(&settings.cors_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// GET /health - Liveness probe
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new();
    }
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}
