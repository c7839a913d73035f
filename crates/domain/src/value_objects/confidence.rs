//! Confidence in a resolved date

use std::fmt;

use serde::{Deserialize, Serialize};

/// How much the resolver trusts a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Recently past or suspiciously far away
    Low,
    /// Year was inferred
    Medium,
    /// Explicit year, upcoming
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        write!(f, "{label}")
    }
}
