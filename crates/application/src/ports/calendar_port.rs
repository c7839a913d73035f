//! Calendar port for application layer
//!
//! Defines the two calendar operations the sync pipeline needs: reading the
//! titles of upcoming events and creating one event per deadline.
//! Implemented by adapters in the infrastructure layer.

use async_trait::async_trait;
use domain::{Deadline, EventRef};
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

/// Calendar port errors
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("Calendar service unavailable")]
    ServiceUnavailable,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Calendar rate limit exceeded")]
    RateLimited,

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Invalid event data: {0}")]
    InvalidEvent(String),
}

impl CalendarError {
    /// Whether a later attempt may succeed
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable | Self::RateLimited | Self::OperationFailed(_)
        )
    }
}

/// Calendar port trait
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CalendarPort: Send + Sync {
    /// Titles of events starting within the next `lookahead_days`
    async fn list_existing_titles(&self, lookahead_days: u32)
    -> Result<Vec<String>, CalendarError>;

    /// Create an event for a deadline
    ///
    /// # Returns
    /// A reference to the created event
    async fn create_event(&self, deadline: &Deadline) -> Result<EventRef, CalendarError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(CalendarError::ServiceUnavailable.is_retryable());
        assert!(CalendarError::RateLimited.is_retryable());
        assert!(CalendarError::OperationFailed("503".to_string()).is_retryable());
    }

    #[test]
    fn permanent_errors_are_not_retryable() {
        assert!(!CalendarError::AuthenticationFailed.is_retryable());
        assert!(!CalendarError::InvalidEvent("bad".to_string()).is_retryable());
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            CalendarError::OperationFailed("quota".to_string()).to_string(),
            "Operation failed: quota"
        );
    }
}
