//! Deadline urgency bucket

use std::fmt;

use serde::{Deserialize, Serialize};

/// How soon a deadline is due
///
/// - Urgent: 0-3 days
/// - Soon: 4-7 days
/// - Later: more than 7 days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Due within three days
    Urgent,
    /// Due within a week
    Soon,
    /// Due later than a week from now
    Later,
}

impl Urgency {
    /// Bucket a number of days until the deadline
    #[must_use]
    pub const fn from_days(days: i64) -> Self {
        match days {
            i64::MIN..=3 => Self::Urgent,
            4..=7 => Self::Soon,
            _ => Self::Later,
        }
    }

    /// Get a human-readable label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Urgent => "Urgent",
            Self::Soon => "Soon",
            Self::Later => "Later",
        }
    }

    /// Get an emoji representation
    #[must_use]
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::Urgent => "🔴",
            Self::Soon => "🟡",
            Self::Later => "🟢",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
