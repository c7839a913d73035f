//! Reference to an event created on the external calendar

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle returned by the calendar after a successful create
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRef(String);

impl EventRef {
    /// Wrap a calendar-provided event identifier
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the reference as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EventRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}
