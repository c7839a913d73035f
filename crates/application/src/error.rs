//! Application-level errors

use domain::{DomainError, TrackerError};
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Illegal processed-email state transition
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// External service error
    #[error("External service error: {0}")]
    ExternalService(String),

    /// User not authorized
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ExternalService(_))
    }
}

#[cfg(test)]
mod tests {
    use domain::ProcessingState;

    use super::*;

    #[test]
    fn external_service_is_retryable() {
        assert!(ApplicationError::ExternalService("down".to_string()).is_retryable());
    }

    #[test]
    fn internal_is_not_retryable() {
        assert!(!ApplicationError::Internal("bug".to_string()).is_retryable());
        assert!(!ApplicationError::NotFound("x".to_string()).is_retryable());
    }

    #[test]
    fn tracker_error_converts_transparently() {
        let err: ApplicationError = TrackerError::InvalidTransition {
            from: ProcessingState::Created,
            to: ProcessingState::Pending,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Invalid processed-email transition from created to pending"
        );
    }

    #[test]
    fn domain_error_converts_transparently() {
        let err: ApplicationError = DomainError::malformed_email("m1", "missing subject").into();
        assert!(matches!(err, ApplicationError::Domain(_)));
        assert_eq!(err.to_string(), "Malformed email m1: missing subject");
    }
}
