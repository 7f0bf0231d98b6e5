//! Authentication middleware and extractors for axum.
//!
//! This module provides:
//! - `auth_middleware` - Layer that runs the `AuthorizationGate` and injects
//!   the `Principal` into extensions
//! - `RequirePrincipal` - Extractor that reads it back in handlers
//!
//! ```text
//! Request → auth_middleware → injects Principal into extensions
//!                                    ↓
//!                            Handler → RequirePrincipal extractor reads from extensions
//! ```
//!
//! # Example
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/api/v1/appointments", get(list_appointments))
//!     .layer(middleware::from_fn_with_state(gate, auth_middleware));
//!
//! async fn list_appointments(RequirePrincipal(principal): RequirePrincipal) -> String {
//!     format!("Hello, {}!", principal.email)
//! }
//! ```

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::adapters::http::error::ApiError;
use crate::application::AuthorizationGate;
use crate::domain::foundation::{AuthError, Principal};

/// Authentication middleware.
///
/// Every request must carry `Authorization: Bearer <token>`; anything else
/// is answered with 401 before the route handler runs.
pub async fn auth_middleware(
    State(gate): State<AuthorizationGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = match request.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => match value.to_str() {
            Ok(s) => Some(s.to_owned()),
            Err(_) => return ApiError::from(AuthError::MalformedHeader).into_response(),
        },
    };

    match gate.authenticate(header.as_deref()).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Extractor for the authenticated principal.
///
/// Fails with 401 if the auth middleware did not run for this route.
#[derive(Debug, Clone)]
pub struct RequirePrincipal(pub Principal);

impl<S> axum::extract::FromRequestParts<S> for RequirePrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<Principal>()
                .cloned()
                .map(RequirePrincipal)
                .ok_or(AuthRejection::Unauthenticated)
        })
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone)]
pub enum AuthRejection {
    /// No principal in the request extensions.
    Unauthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Unauthenticated => {
                ApiError::from(AuthError::MissingCredentials).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    use crate::adapters::auth::{MockIdentityVerifier, MockProfileResolver};
    use crate::domain::foundation::Role;

    fn gate() -> AuthorizationGate {
        AuthorizationGate::new(
            Arc::new(MockIdentityVerifier::new().with_token("good", "7")),
            Arc::new(MockProfileResolver::new().with_profile("7", "c@example.com", Role::Customer)),
            Duration::from_secs(1),
        )
    }

    async fn whoami(RequirePrincipal(principal): RequirePrincipal) -> String {
        format!("{}:{}", principal.subject_id, principal.role)
    }

    fn app() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(gate(), auth_middleware))
    }

    fn request(auth: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri("/whoami");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Middleware
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn valid_bearer_reaches_handler_with_principal() {
        let response = app().oneshot(request(Some("Bearer good"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"7:customer");
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_401() {
        for auth in [None, Some("good"), Some("Token good"), Some("Bearer good extra")] {
            let response = app().oneshot(request(auth)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{:?}", auth);
        }
    }

    #[tokio::test]
    async fn unknown_token_is_401() {
        let response = app().oneshot(request(Some("Bearer forged"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // RequirePrincipal Extractor
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn require_principal_fails_without_middleware() {
        use axum::extract::FromRequestParts;

        let request: axum::http::Request<()> =
            axum::http::Request::builder().uri("/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let result = RequirePrincipal::from_request_parts(&mut parts, &()).await;

        assert!(matches!(result, Err(AuthRejection::Unauthenticated)));
    }
}
