//! Profile resolution port.
//!
//! The identity provider's user directory is the source of truth for a
//! subject's email and role; nothing here is persisted locally.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, Role, SubjectId};

/// Directory profile for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub email: String,
    pub role: Role,
}

impl Profile {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
        }
    }
}

/// Looks up a subject's profile in the user directory.
///
/// # Contract
///
/// Implementations must:
/// - Return `AuthError::UnknownSubject` if the directory has no such user
/// - Return `AuthError::UnknownRole` if the role is missing or unrecognised
/// - Return `AuthError::UpstreamUnavailable` for transport or server errors
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    async fn resolve(&self, subject: &SubjectId) -> Result<Profile, AuthError>;
}
