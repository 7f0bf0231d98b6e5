//! AuthorizationGate - turns an `Authorization` header into a `Principal`.
//!
//! Two upstream calls per request: token verification, then a directory
//! lookup for email and role. Both are bounded by the same deadline. A
//! header that is not exactly `Bearer <token>` is rejected before either
//! call is made.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{AuthError, Principal};
use crate::ports::{IdentityVerifier, ProfileResolver};

/// Default bound on each upstream call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Extracts the token from a `Bearer <token>` header value.
///
/// The header must consist of exactly two space-separated parts, the
/// first being the literal `Bearer`.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Per-request authentication.
#[derive(Clone)]
pub struct AuthorizationGate {
    verifier: Arc<dyn IdentityVerifier>,
    resolver: Arc<dyn ProfileResolver>,
    upstream_timeout: Duration,
}

impl AuthorizationGate {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        resolver: Arc<dyn ProfileResolver>,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            resolver,
            upstream_timeout,
        }
    }

    /// Authenticates a raw `Authorization` header value.
    ///
    /// # Errors
    ///
    /// - `MissingCredentials` / `MalformedHeader` without any upstream call
    /// - `InvalidToken` / `TokenExpired` from the verifier
    /// - `UnknownSubject` / `UnknownRole` from the directory
    /// - `UpstreamUnavailable` if either call fails or exceeds the deadline
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Principal, AuthError> {
        let token = bearer_token(header)?;

        let subject_id = tokio::time::timeout(self.upstream_timeout, self.verifier.verify(token))
            .await
            .map_err(|_| AuthError::upstream("token verification timed out"))??;

        let profile =
            tokio::time::timeout(self.upstream_timeout, self.resolver.resolve(&subject_id))
                .await
                .map_err(|_| AuthError::upstream("directory lookup timed out"))??;

        tracing::debug!(
            subject_id = %subject_id,
            role = %profile.role,
            "Request authenticated"
        );

        Ok(Principal::new(subject_id, profile.role, profile.email))
    }
}

impl std::fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGate")
            .field("upstream_timeout", &self.upstream_timeout)
            .finish_non_exhaustive()
    }
}
