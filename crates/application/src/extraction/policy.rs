//! Tunable thresholds for date resolution and deadline selection

use serde::{Deserialize, Serialize};

/// Thresholds applied when turning candidates into a deadline
///
/// The defaults reproduce the observed behaviour of the mailbox scanner;
/// none of the numbers is load-bearing beyond that.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeadlinePolicy {
    /// A yearless date more than this many days in the past is moved to
    /// next year
    #[serde(default)]
    pub year_rollover_after_days: i64,

    /// Body dates up to this many days old are kept with low confidence
    #[serde(default = "default_body_grace_days")]
    pub body_grace_days: i64,

    /// Yearless subject dates further ahead than this are flagged
    #[serde(default = "default_subject_far_future_days")]
    pub subject_far_future_days: i64,

    /// Read `03/04/2026` as 3 April instead of March 4
    #[serde(default)]
    pub numeric_day_first: bool,

    /// Skip subject dates of `Re:`/`Fwd:` messages
    #[serde(default = "default_true")]
    pub ignore_subject_on_reply: bool,

    /// Characters searched on each side of the winning date for type keywords
    #[serde(default = "default_type_context_chars")]
    pub type_context_chars: usize,
}

const fn default_body_grace_days() -> i64 {
    30
}

const fn default_subject_far_future_days() -> i64 {
    180
}

const fn default_true() -> bool {
    true
}

const fn default_type_context_chars() -> usize {
    120
}

impl Default for DeadlinePolicy {
    fn default() -> Self {
        Self {
            year_rollover_after_days: 0,
            body_grace_days: default_body_grace_days(),
            subject_far_future_days: default_subject_far_future_days(),
            numeric_day_first: false,
            ignore_subject_on_reply: true,
            type_context_chars: default_type_context_chars(),
        }
    }
}
