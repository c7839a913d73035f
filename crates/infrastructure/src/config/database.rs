//! Database (SQLite) configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::default_true;

/// SQLite database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Maximum number of concurrent database connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Whether to run pending migrations on startup (default: true)
    #[serde(default = "default_true")]
    pub run_migrations: bool,

    /// Seconds after which a pending claim left by a dead scan is released
    #[serde(default = "default_pending_lease_secs")]
    pub pending_lease_secs: u64,
}

fn default_db_path() -> String {
    "deadline-sync.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_pending_lease_secs() -> u64 {
    15 * 60
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            run_migrations: true,
            pending_lease_secs: default_pending_lease_secs(),
        }
    }
}

impl DatabaseConfig {
    /// Single-connection in-memory database, mainly for tests
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: ":memory:".to_string(),
            max_connections: 1,
            run_migrations: true,
            pending_lease_secs: default_pending_lease_secs(),
        }
    }

    /// Lease of a pending claim
    pub const fn pending_lease(&self) -> Duration {
        Duration::from_secs(self.pending_lease_secs)
    }

    /// Whether this points at an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }
}
