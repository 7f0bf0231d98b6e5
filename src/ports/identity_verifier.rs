//! Identity verification port for bearer tokens.
//!
//! Implementations check a token against the identity provider's public
//! key material and return the subject it was issued to. They never look
//! up profile data; that is `ProfileResolver`'s job.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, SubjectId};

/// Validates bearer tokens and extracts the subject.
///
/// # Contract
///
/// Implementations must:
/// - Validate the token signature, issuer and expiry
/// - Return `AuthError::InvalidToken` for malformed or badly signed tokens
/// - Return `AuthError::TokenExpired` for expired tokens
/// - Return `AuthError::UpstreamUnavailable` when key material cannot be fetched
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a raw token (without the `Bearer ` prefix).
    async fn verify(&self, token: &str) -> Result<SubjectId, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_verifier_is_object_safe() {
        fn _accepts_dyn(_verifier: &dyn IdentityVerifier) {}
    }
}
