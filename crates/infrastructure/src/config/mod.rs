//! Application configuration
//!
//! Split into focused sub-modules:
//! - `database`: SQLite database settings
//! - `scan`: scan defaults and create timeout
//! - `logging`: log filter and output format
//!
//! The date policy is the application layer's [`DeadlinePolicy`] and is
//! read from the `[policy]` section as-is.

mod database;
mod logging;
mod scan;

use std::path::Path;

use application::DeadlinePolicy;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use database::DatabaseConfig;
pub use logging::LoggingConfig;
pub use scan::ScanAppConfig;

/// Prefix of environment overrides, e.g. `DEADLINE_SYNC_SCAN__MAX_EMAILS`
pub const ENV_PREFIX: &str = "DEADLINE_SYNC";

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Date resolution thresholds
    #[serde(default)]
    pub policy: DeadlinePolicy,

    /// Scan defaults
    #[serde(default)]
    pub scan: ScanAppConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `config.toml` (if present) and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit file (required) or `config.toml`
    /// (optional), then apply environment overrides
    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("config").required(false),
        };

        let builder = config::Config::builder()
            .add_source(file)
            // Override with environment variables (e.g., DEADLINE_SYNC_DATABASE__PATH)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(database = %config.database.path, "Configuration loaded");
        Ok(config)
    }

    /// Reject values no scan can run with
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.database.max_connections == 0 {
            return Err(config::ConfigError::Message(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.scan.max_emails == 0 {
            return Err(config::ConfigError::Message(
                "scan.max_emails must be at least 1".to_string(),
            ));
        }
        if self.scan.create_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "scan.create_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.database.pending_lease_secs <= self.scan.create_timeout_secs {
            return Err(config::ConfigError::Message(
                "database.pending_lease_secs must exceed scan.create_timeout_secs".to_string(),
            ));
        }
        if self.policy.body_grace_days < 0 || self.policy.subject_far_future_days < 0 {
            return Err(config::ConfigError::Message(
                "policy day thresholds must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
