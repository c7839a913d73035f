//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// An email is missing data required to process it
    #[error("Malformed email {id}: {reason}")]
    MalformedEmail { id: String, reason: String },

    /// Identifier was empty or otherwise unusable
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Unknown deadline type label
    #[error("Unknown deadline type: {0}")]
    UnknownDeadlineType(String),

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Date/time parsing error
    #[error("Invalid date/time: {0}")]
    InvalidDateTime(String),
}

impl DomainError {
    /// Create a malformed email error
    pub fn malformed_email(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedEmail {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
