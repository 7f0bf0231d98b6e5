//! Mock identity adapters for testing.
//!
//! These implement `IdentityVerifier` and `ProfileResolver` without a real
//! identity provider. Both count their calls, so tests can assert that a
//! rejected header never reached them.
//!
//! # Example
//!
//! ```ignore
//! let verifier = MockIdentityVerifier::new().with_token("tok-42", "42");
//! let resolver = MockProfileResolver::new().with_profile("42", "c@x.io", Role::Customer);
//!
//! let subject = verifier.verify("tok-42").await?;
//! let profile = resolver.resolve(&subject).await?;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, Role, SubjectId};
use crate::ports::{IdentityVerifier, Profile, ProfileResolver};

/// Mock identity verifier.
///
/// Stores a map of tokens to subjects. Tokens not in the map return
/// `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockIdentityVerifier {
    tokens: RwLock<HashMap<String, String>>,
    force_error: RwLock<Option<AuthError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a valid token issued to `subject`.
    pub fn with_token(self, token: impl Into<String>, subject: impl Into<String>) -> Self {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), subject.into());
        self
    }

    /// Forces all verifications to return the specified error.
    pub fn with_error(self, error: AuthError) -> Self {
        *self
            .force_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
        self
    }

    /// Sleeps before answering, to exercise caller deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `verify` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityVerifier for MockIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<SubjectId, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self
            .force_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }

        let subject = self
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)?;
        SubjectId::new(subject).map_err(|_| AuthError::InvalidToken)
    }
}

/// Mock profile resolver.
///
/// Stores a map of subjects to profiles. Unknown subjects return
/// `UnknownSubject`.
#[derive(Debug, Default)]
pub struct MockProfileResolver {
    profiles: RwLock<HashMap<String, Profile>>,
    force_error: RwLock<Option<AuthError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockProfileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, subject: impl Into<String>, email: &str, role: Role) -> Self {
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subject.into(), Profile::new(email, role));
        self
    }

    pub fn with_error(self, error: AuthError) -> Self {
        *self
            .force_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `resolve` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileResolver for MockProfileResolver {
    async fn resolve(&self, subject: &SubjectId) -> Result<Profile, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self
            .force_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }

        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(subject.as_str())
            .cloned()
            .ok_or(AuthError::UnknownSubject)
    }
}
