//! Scan request and result types

use domain::{Deadline, EmailId, UserId};
use serde::{Deserialize, Serialize};

/// Default number of messages fetched per scan
pub const DEFAULT_MAX_EMAILS: usize = 50;

/// Default look-back window in days
pub const DEFAULT_DAYS_BACK: u32 = 7;

/// Parameters of one scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub user_id: UserId,
    #[serde(default = "default_max_emails")]
    pub max_emails: usize,
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    /// Provider search query, empty for all messages
    #[serde(default)]
    pub query: String,
}

const fn default_max_emails() -> usize {
    DEFAULT_MAX_EMAILS
}

const fn default_days_back() -> u32 {
    DEFAULT_DAYS_BACK
}

impl ScanRequest {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            max_emails: DEFAULT_MAX_EMAILS,
            days_back: DEFAULT_DAYS_BACK,
            query: String::new(),
        }
    }

    #[must_use]
    pub const fn with_max_emails(mut self, max_emails: usize) -> Self {
        self.max_emails = max_emails;
        self
    }

    #[must_use]
    pub const fn with_days_back(mut self, days_back: u32) -> Self {
        self.days_back = days_back;
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }
}

/// Per-scan counters
///
/// Every scanned email lands in exactly one of `emitted`, `no_deadline`,
/// `expired`, `duplicate_id` or `duplicate_title`. Malformed emails and
/// emails whose tracker lookup failed are counted separately and are not
/// part of `scanned`. `create_failed` is a subset of `emitted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub scanned: usize,
    pub emitted: usize,
    pub no_deadline: usize,
    pub expired: usize,
    pub duplicate_id: usize,
    pub duplicate_title: usize,
    pub create_failed: usize,
    /// Failed creates whose claim could not be rolled back; these stay
    /// pending until the store's lease expires
    pub rollback_failed: usize,
    pub malformed: usize,
    pub tracker_errors: usize,
    /// The calendar title lookup failed and duplicate titles were not checked
    pub title_check_skipped: bool,
}

impl ScanSummary {
    /// Whether the per-outcome counters add up to `scanned`
    pub const fn is_consistent(&self) -> bool {
        self.scanned
            == self.emitted
                + self.no_deadline
                + self.expired
                + self.duplicate_id
                + self.duplicate_title
            && self.create_failed <= self.emitted
    }
}

/// A deadline whose calendar event could not be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFailure {
    pub email_id: EmailId,
    pub title: String,
    pub reason: String,
    /// A later scan may succeed
    pub retryable: bool,
}

/// Outcome of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub summary: ScanSummary,
    /// Deadlines whose events were created and committed
    pub deadlines: Vec<Deadline>,
    pub failures: Vec<CreateFailure>,
    /// The scan stopped early on cancellation or timeout
    pub aborted: bool,
}
