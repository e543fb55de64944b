//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `CREEM_SYNC`
//! prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use creem_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod server;
mod webhook;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};
pub use webhook::WebhookConfig;

use serde::Deserialize;

/// Root application configuration.
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
/// The webhook secret is resolved here, once, at startup; a missing secret is
/// a configuration error, never a per-request failure.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Webhook configuration (Creem signing secret)
    pub webhook: WebhookConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Loads `.env` if present (development), then reads variables with the
    /// `CREEM_SYNC` prefix, e.g.:
    ///
    /// - `CREEM_SYNC__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CREEM_SYNC__DATABASE__URL=...` -> `database.url = ...`
    /// - `CREEM_SYNC__WEBHOOK__CREEM_WEBHOOK_SECRET=whsec_...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or cannot be
    /// parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CREEM_SYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.webhook.validate()?;
        Ok(())
    }

    /// Check if running in production environment.
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
