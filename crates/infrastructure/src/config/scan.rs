//! Scan defaults and limits.

use std::time::Duration;

use application::{DEFAULT_DAYS_BACK, DEFAULT_MAX_EMAILS, SyncSettings};
use serde::{Deserialize, Serialize};

/// Scan configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanAppConfig {
    /// Messages fetched per scan (default: 50)
    #[serde(default = "default_max_emails")]
    pub max_emails: usize,

    /// Look-back window in days (default: 7)
    #[serde(default = "default_days_back")]
    pub days_back: u32,

    /// Days ahead searched for existing calendar titles (default: 365)
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: u32,

    /// Timeout for one calendar create call in seconds (default: 30)
    #[serde(default = "default_create_timeout_secs")]
    pub create_timeout_secs: u64,
}

const fn default_max_emails() -> usize {
    DEFAULT_MAX_EMAILS
}

const fn default_days_back() -> u32 {
    DEFAULT_DAYS_BACK
}

const fn default_lookahead_days() -> u32 {
    365
}

const fn default_create_timeout_secs() -> u64 {
    30
}

impl Default for ScanAppConfig {
    fn default() -> Self {
        Self {
            max_emails: default_max_emails(),
            days_back: default_days_back(),
            lookahead_days: default_lookahead_days(),
            create_timeout_secs: default_create_timeout_secs(),
        }
    }
}

impl ScanAppConfig {
    /// Settings for the sync service
    pub const fn to_settings(&self) -> SyncSettings {
        SyncSettings {
            max_emails: self.max_emails,
            days_back: self.days_back,
            lookahead_days: self.lookahead_days,
            create_timeout: Duration::from_secs(self.create_timeout_secs),
        }
    }
}
