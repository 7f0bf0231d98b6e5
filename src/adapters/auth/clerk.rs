//! Clerk adapters for token verification and profile lookup.
//!
//! - `ClerkIdentityVerifier` validates session JWTs against the issuer's
//!   JWKS and returns the `sub` claim.
//! - `ClerkDirectoryClient` fetches email and role from the Backend API
//!   user directory.
//!
//! # Example
//!
//! ```ignore
//! let http = reqwest::Client::builder().build()?;
//! let verifier = ClerkIdentityVerifier::new(
//!     ClerkConfig::new("https://clerk.harmonia.app"),
//!     http.clone(),
//! );
//! let directory = ClerkDirectoryClient::new("https://api.clerk.com", secret, http);
//!
//! let subject = verifier.verify("eyJ...").await?;
//! let profile = directory.resolve(&subject).await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{
    decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, TokenData, Validation,
};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::domain::foundation::{AuthError, Role, SubjectId};
use crate::ports::{IdentityVerifier, Profile, ProfileResolver};

/// Default JWKS cache lifetime.
pub const DEFAULT_JWKS_CACHE: Duration = Duration::from_secs(3600);

/// Configuration for JWT verification.
#[derive(Debug, Clone)]
pub struct ClerkConfig {
    /// Frontend API URL, used for JWKS discovery and the `iss` check.
    pub issuer_url: String,

    /// Expected audience. Clerk session tokens carry none by default.
    pub audience: Option<String>,

    /// How long to cache JWKS before refetching.
    pub jwks_cache_duration: Duration,
}

impl ClerkConfig {
    pub fn new(issuer_url: impl Into<String>) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            audience: None,
            jwks_cache_duration: DEFAULT_JWKS_CACHE,
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.jwks_cache_duration = duration;
        self
    }

    fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
}

/// Cached JWKS with expiry tracking.
struct JwksCache {
    jwks: JwkSet,
    fetched_at: Instant,
    cache_duration: Duration,
}

impl JwksCache {
    fn new(jwks: JwkSet, cache_duration: Duration) -> Self {
        Self {
            jwks,
            fetched_at: Instant::now(),
            cache_duration,
        }
    }

    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > self.cache_duration
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Identity verifier
// ════════════════════════════════════════════════════════════════════════════════

/// Verifies Clerk session tokens.
///
/// JWKS is fetched lazily on first use and refreshed once the cache
/// expires or a token names a `kid` the cached set does not contain.
pub struct ClerkIdentityVerifier {
    config: ClerkConfig,
    http_client: reqwest::Client,
    jwks_cache: Arc<RwLock<Option<JwksCache>>>,
}

impl ClerkIdentityVerifier {
    pub fn new(config: ClerkConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
            jwks_cache: Arc::new(RwLock::new(None)),
        }
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let url = self.config.jwks_url();

        tracing::debug!(url = %url, "Fetching JWKS");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch JWKS");
            AuthError::upstream(format!("Failed to fetch JWKS: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(%status, "JWKS endpoint returned an error");
            return Err(AuthError::upstream(format!("JWKS endpoint returned {}", status)));
        }

        let jwks: JwkSet = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse JWKS");
            AuthError::upstream(format!("Failed to parse JWKS: {}", e))
        })?;

        tracing::debug!(keys = jwks.keys.len(), "Fetched JWKS");

        Ok(jwks)
    }

    /// Get JWKS, using cache if available and not expired.
    async fn get_jwks(&self, force_refresh: bool) -> Result<JwkSet, AuthError> {
        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if let Some(ref cached) = *cache {
                if !cached.is_expired() {
                    return Ok(cached.jwks.clone());
                }
            }
        }

        let jwks = self.fetch_jwks().await?;

        {
            let mut cache = self.jwks_cache.write().await;
            *cache = Some(JwksCache::new(jwks.clone(), self.config.jwks_cache_duration));
        }

        Ok(jwks)
    }

    fn find_decoding_key(
        header: &jsonwebtoken::Header,
        jwks: &JwkSet,
    ) -> Result<Option<(DecodingKey, Algorithm)>, AuthError> {
        let kid = header.kid.as_ref().ok_or_else(|| {
            tracing::warn!("JWT missing 'kid' header");
            AuthError::InvalidToken
        })?;

        let Some(jwk) = jwks.find(kid) else {
            return Ok(None);
        };

        let algorithm = match jwk.common.key_algorithm {
            Some(jsonwebtoken::jwk::KeyAlgorithm::RS256) | None => Algorithm::RS256,
            Some(jsonwebtoken::jwk::KeyAlgorithm::RS384) => Algorithm::RS384,
            Some(jsonwebtoken::jwk::KeyAlgorithm::RS512) => Algorithm::RS512,
            Some(jsonwebtoken::jwk::KeyAlgorithm::ES256) => Algorithm::ES256,
            Some(other) => {
                tracing::warn!(algorithm = ?other, "Unsupported JWK algorithm");
                return Err(AuthError::InvalidToken);
            }
        };

        // A token must not pick its own algorithm.
        if header.alg != algorithm {
            tracing::warn!(header = ?header.alg, key = ?algorithm, "JWT algorithm mismatch");
            return Err(AuthError::InvalidToken);
        }

        let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| {
            tracing::warn!(error = %e, "Failed to create decoding key");
            AuthError::InvalidToken
        })?;

        Ok(Some((decoding_key, algorithm)))
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[self.config.issuer_url.trim_end_matches('/')]);
        match &self.config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }

    fn validate_token(
        &self,
        token: &str,
        decoding_key: &DecodingKey,
        algorithm: Algorithm,
    ) -> Result<TokenData<SessionClaims>, AuthError> {
        decode::<SessionClaims>(token, decoding_key, &self.validation(algorithm)).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                _ => {
                    tracing::warn!(error = %e, "Token validation failed");
                    AuthError::InvalidToken
                }
            }
        })
    }
}

#[async_trait]
impl IdentityVerifier for ClerkIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<SubjectId, AuthError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "Failed to decode JWT header");
            AuthError::InvalidToken
        })?;

        let jwks = self.get_jwks(false).await?;
        let key = match Self::find_decoding_key(&header, &jwks)? {
            Some(key) => key,
            // Unknown kid: the issuer may have rotated keys since we cached.
            None => {
                let refreshed = self.get_jwks(true).await?;
                Self::find_decoding_key(&header, &refreshed)?.ok_or_else(|| {
                    tracing::warn!(kid = ?header.kid, "No matching key in JWKS");
                    AuthError::InvalidToken
                })?
            }
        };

        let claims = self.validate_token(token, &key.0, key.1)?.claims;

        SubjectId::new(claims.sub).map_err(|_| {
            tracing::warn!("Token carries an empty subject");
            AuthError::InvalidToken
        })
    }
}

impl std::fmt::Debug for ClerkIdentityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClerkIdentityVerifier")
            .field("issuer_url", &self.config.issuer_url)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Directory client
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct DirectoryUser {
    #[serde(default)]
    email_addresses: Vec<DirectoryEmail>,
    #[serde(default)]
    public_metadata: PublicMetadata,
}

#[derive(Debug, Deserialize)]
struct DirectoryEmail {
    email_address: String,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetadata {
    #[serde(default)]
    role: Option<String>,
}

impl DirectoryUser {
    fn into_profile(self) -> Result<Profile, AuthError> {
        let role = self
            .public_metadata
            .role
            .ok_or_else(|| AuthError::UnknownRole(String::new()))?
            .parse::<Role>()?;
        let email = self
            .email_addresses
            .into_iter()
            .next()
            .map(|e| e.email_address)
            .unwrap_or_default();
        Ok(Profile::new(email, role))
    }
}

/// Resolves profiles through the Clerk Backend API.
pub struct ClerkDirectoryClient {
    base_url: String,
    secret_key: SecretString,
    http_client: reqwest::Client,
}

impl ClerkDirectoryClient {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: SecretString,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            secret_key,
            http_client,
        }
    }

    fn user_url(&self, subject: &SubjectId) -> String {
        format!("{}/v1/users/{}", self.base_url.trim_end_matches('/'), subject)
    }
}

#[async_trait]
impl ProfileResolver for ClerkDirectoryClient {
    async fn resolve(&self, subject: &SubjectId) -> Result<Profile, AuthError> {
        let response = self
            .http_client
            .get(self.user_url(subject))
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Directory request failed");
                AuthError::upstream(format!("Directory request failed: {}", e))
            })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                tracing::warn!(subject = %subject, "Subject not found in directory");
                return Err(AuthError::UnknownSubject);
            }
            status => {
                tracing::error!(%status, "Directory returned an error");
                return Err(AuthError::upstream(format!("Directory returned {}", status)));
            }
        }

        let user: DirectoryUser = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse directory user");
            AuthError::upstream(format!("Failed to parse directory user: {}", e))
        })?;

        user.into_profile().map_err(|e| {
            tracing::warn!(subject = %subject, error = %e, "Directory role rejected");
            e
        })
    }
}

impl std::fmt::Debug for ClerkDirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClerkDirectoryClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_builds_correct_jwks_url() {
        let config = ClerkConfig::new("https://clerk.example.com/");
        assert_eq!(
            config.jwks_url(),
            "https://clerk.example.com/.well-known/jwks.json"
        );
        assert_eq!(config.jwks_cache_duration, DEFAULT_JWKS_CACHE);
    }

    #[test]
    fn audience_is_only_checked_when_configured() {
        let client = reqwest::Client::new();
        let open = ClerkIdentityVerifier::new(ClerkConfig::new("https://clerk.example.com"), client.clone());
        let strict = ClerkIdentityVerifier::new(
            ClerkConfig::new("https://clerk.example.com").with_audience("harmonia"),
            client,
        );
        assert!(!open.validation(Algorithm::RS256).validate_aud);
        assert!(strict.validation(Algorithm::RS256).validate_aud);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Token Rejection Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn garbage_token_is_rejected_before_any_fetch() {
        let verifier = ClerkIdentityVerifier::new(
            ClerkConfig::new("http://127.0.0.1:9"),
            reqwest::Client::new(),
        );
        assert_eq!(verifier.verify("not-a-jwt").await, Err(AuthError::InvalidToken));
    }

    #[test]
    fn jwks_cache_expires_after_duration() {
        let cache = JwksCache::new(JwkSet { keys: vec![] }, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.is_expired());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Directory Decoding Tests
    // ════════════════════════════════════════════════════════════════════════════

    fn decode_user(json: &str) -> Result<Profile, AuthError> {
        serde_json::from_str::<DirectoryUser>(json)
            .unwrap()
            .into_profile()
    }

    #[test]
    fn directory_user_maps_first_email_and_legacy_role() {
        let profile = decode_user(
            r#"{"email_addresses":[{"email_address":"a@x.io"},{"email_address":"b@x.io"}],
                "public_metadata":{"role":"masseur"}}"#,
        )
        .unwrap();
        assert_eq!(profile, Profile::new("a@x.io", Role::Provider));
    }

    #[test]
    fn directory_user_without_role_fails_closed() {
        assert!(matches!(
            decode_user(r#"{"email_addresses":[{"email_address":"a@x.io"}]}"#),
            Err(AuthError::UnknownRole(_))
        ));
        assert!(matches!(
            decode_user(r#"{"public_metadata":{"role":"superuser"}}"#),
            Err(AuthError::UnknownRole(_))
        ));
    }

    #[test]
    fn directory_url_uses_subject() {
        let client = ClerkDirectoryClient::new(
            "https://api.clerk.com/",
            SecretString::new("sk_test_x".to_string()),
            reqwest::Client::new(),
        );
        let subject = SubjectId::new("user_2abc").unwrap();
        assert_eq!(client.user_url(&subject), "https://api.clerk.com/v1/users/user_2abc");
        assert!(!format!("{:?}", client).contains("sk_test_x"));
    }

    #[test]
    fn adapters_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClerkIdentityVerifier>();
        assert_send_sync::<ClerkDirectoryClient>();
    }

    #[tokio::test]
    #[ignore = "Requires a live Clerk instance (CLERK_ISSUER_URL)"]
    async fn integration_test_fetch_jwks() {
        let issuer = std::env::var("CLERK_ISSUER_URL").unwrap();
        let verifier = ClerkIdentityVerifier::new(ClerkConfig::new(issuer), reqwest::Client::new());
        let jwks = verifier.fetch_jwks().await.unwrap();
        assert!(!jwks.keys.is_empty());
    }
}
