//! Identity provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Identity provider configuration (Clerk).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Frontend API URL; issuer of session tokens and host of the JWKS
    pub issuer_url: String,

    /// Backend API base for directory lookups
    #[serde(default = "default_directory_url")]
    pub directory_url: String,

    /// Backend API secret key (`sk_...`)
    pub secret_key: SecretString,

    /// Expected `aud` claim, if tokens carry one
    #[serde(default)]
    pub audience: Option<String>,

    /// JWKS cache TTL in seconds
    #[serde(default = "default_jwks_cache_ttl")]
    pub jwks_cache_ttl_secs: u64,

    /// Deadline for each upstream call made by the gate
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,
}

impl AuthConfig {
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Validate identity provider configuration
    ///
    /// In production the issuer must be HTTPS.
    pub fn validate(&self, environment: Environment) -> Result<(), ValidationError> {
        if self.issuer_url.is_empty() {
            return Err(ValidationError::MissingRequired("auth.issuer_url"));
        }
        let key = self.secret_key.expose_secret();
        if key.is_empty() {
            return Err(ValidationError::MissingRequired("auth.secret_key"));
        }
        if !key.starts_with("sk_") {
            return Err(ValidationError::InvalidDirectoryKey);
        }
        if self.upstream_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if environment == Environment::Production && !self.issuer_url.starts_with("https://") {
            return Err(ValidationError::IssuerMustBeHttps);
        }
        Ok(())
    }
}

fn default_directory_url() -> String {
    "https://api.clerk.com".to_string()
}

fn default_jwks_cache_ttl() -> u64 {
    3600
}

fn default_upstream_timeout() -> u64 {
    5
}
