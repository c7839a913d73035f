//! Deadline type value object

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Kind of deadline announced by an email
///
/// Inferred from keywords near the selected date. `Application` is the
/// fallback when no keyword is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineType {
    /// Submit an application or its documents
    #[default]
    Application,
    /// Attend or confirm an interview
    Interview,
    /// Complete a test, coding challenge or assessment
    Assessment,
    /// Reply to or confirm something
    Response,
    /// Register for or attend an event
    Event,
}

impl DeadlineType {
    /// Get the lowercase label used in storage and JSON
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Interview => "interview",
            Self::Assessment => "assessment",
            Self::Response => "response",
            Self::Event => "event",
        }
    }

    /// Prefix placed in front of the email subject in calendar titles
    #[must_use]
    pub const fn title_prefix(&self) -> &'static str {
        match self {
            Self::Application => "📝 APPLICATION DEADLINE",
            Self::Interview => "🎯 INTERVIEW DEADLINE",
            Self::Assessment => "💻 ASSESSMENT DEADLINE",
            Self::Response => "✉️ RESPONSE DEADLINE",
            Self::Event => "📅 EVENT DEADLINE",
        }
    }

    /// What the user is expected to do before the deadline
    #[must_use]
    pub const fn action_text(&self) -> &'static str {
        match self {
            Self::Application => "Submit your complete application with all required documents",
            Self::Interview => "Confirm your interview attendance and prepare thoroughly",
            Self::Assessment => "Complete the coding challenge or assessment test",
            Self::Response => "Send your response or confirmation as requested",
            Self::Event => "Register or attend the scheduled event",
        }
    }

    /// Reminder offsets in minutes before the event
    ///
    /// Every type gets a one hour and a one day reminder; applications and
    /// assessments add one week and three days, interviews add two days and
    /// three hours.
    #[must_use]
    pub fn reminder_minutes(&self) -> Vec<u32> {
        let mut minutes = vec![60, 1440];
        match self {
            Self::Application | Self::Assessment => minutes.extend([10080, 4320]),
            Self::Interview => minutes.extend([2880, 180]),
            Self::Response | Self::Event => {},
        }
        minutes
    }

    /// All deadline types
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::Application,
            Self::Interview,
            Self::Assessment,
            Self::Response,
            Self::Event,
        ]
    }
}

impl fmt::Display for DeadlineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeadlineType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::UnknownDeadlineType(s.to_string()))
    }
}
