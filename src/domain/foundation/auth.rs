//! Authentication types for the domain layer.
//!
//! A `Principal` is what every protected request carries after the
//! authorization gate has run: who the caller is and which role the
//! identity directory assigns to them. These types have no provider
//! dependencies; the Clerk adapters and the test mocks both produce them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::SubjectId;

/// Tenant role of a caller.
///
/// The directory stores the legacy names `client` and `masseur`; both the
/// legacy and the current names are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "client")]
    Customer,
    #[serde(alias = "masseur")]
    Provider,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Customer, Role::Provider, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Provider => "provider",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" | "client" => Ok(Role::Customer),
            "provider" | "masseur" => Ok(Role::Provider),
            "admin" => Ok(Role::Admin),
            other => Err(AuthError::UnknownRole(other.to_string())),
        }
    }
}

/// Authenticated caller, derived per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject_id: SubjectId,
    pub role: Role,
    pub email: String,
}

impl Principal {
    pub fn new(subject_id: SubjectId, role: Role, email: impl Into<String>) -> Self {
        Self {
            subject_id,
            role,
            email: email.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Failures of the authorization gate.
///
/// Everything except `UpstreamUnavailable` means the credential itself
/// cannot be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Malformed authorization header")]
    MalformedHeader,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    /// Token verified but the directory has no such user.
    #[error("Unknown subject")]
    UnknownSubject,

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Identity provider unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl AuthError {
    /// Creates an upstream unavailable error with a message.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(message.into())
    }

    /// Returns true if this error indicates the user should re-authenticate.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::MissingCredentials
                | AuthError::MalformedHeader
                | AuthError::InvalidToken
                | AuthError::TokenExpired
        )
    }

    /// Returns true if this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::UpstreamUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_legacy_and_current_names() {
        assert_eq!("client".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!("customer".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!("masseur".parse::<Role>().unwrap(), Role::Provider);
        assert_eq!("Provider".parse::<Role>().unwrap(), Role::Provider);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_eq!(
            "superuser".parse::<Role>(),
            Err(AuthError::UnknownRole("superuser".to_string()))
        );
    }

    #[test]
    fn role_deserializes_with_aliases() {
        let role: Role = serde_json::from_str("\"masseur\"").unwrap();
        assert_eq!(role, Role::Provider);
        assert_eq!(serde_json::to_string(&Role::Customer).unwrap(), "\"customer\"");
    }

    #[test]
    fn only_upstream_errors_are_transient() {
        assert!(AuthError::upstream("timeout").is_transient());
        assert!(!AuthError::InvalidToken.is_transient());
        assert!(AuthError::TokenExpired.requires_reauthentication());
        assert!(!AuthError::UnknownRole("x".into()).requires_reauthentication());
    }
}
