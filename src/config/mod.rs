//! Application configuration module
//!
//! Type-safe configuration loading using the `config` and `dotenvy` crates.
//! Sources, later ones overriding earlier ones:
//!
//! 1. `.env` file, if present (development)
//! 2. YAML file `harmonia.yaml`, or the path in `HARMONIA_CONFIG_FILE` (optional)
//! 3. Environment variables with the `HARMONIA` prefix and `__` separators
//!
//! # Example
//!
//! ```no_run
//! use harmonia::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod auth;
mod database;
mod error;
mod payment;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, LogFormat, ServerConfig};

use serde::Deserialize;

/// Environment variable naming an alternative YAML file.
pub const CONFIG_FILE_ENV: &str = "HARMONIA_CONFIG_FILE";

/// YAML file read when `HARMONIA_CONFIG_FILE` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "harmonia.yaml";

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Bind address, logging, timeouts, CORS
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection pool
    pub database: DatabaseConfig,

    /// Identity provider (Clerk)
    pub auth: AuthConfig,

    /// Payment processor (Stripe)
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from the YAML file and environment variables
    ///
    /// # Environment Variable Format
    ///
    /// - `HARMONIA__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `HARMONIA__DATABASE__URL=...` -> `database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required values are missing from every source
    /// - Values cannot be parsed into expected types
    /// - The YAML file exists but is malformed
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let file = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let config = config::Config::builder()
            .add_source(config::File::new(&file, config::FileFormat::Yaml).required(false))
            .add_source(
                config::Environment::with_prefix("HARMONIA")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate(self.server.environment)?;
        self.payment.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
