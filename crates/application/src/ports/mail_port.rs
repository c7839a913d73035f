//! Mail port for application layer
//!
//! Read-only access to a user's recent messages.

use async_trait::async_trait;
use domain::EmailMessage;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

/// Mail port errors
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail service unavailable")]
    ServiceUnavailable,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Invalid search query: {0}")]
    InvalidQuery(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Mail port trait
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MailPort: Send + Sync {
    /// Fetch up to `max_count` messages received within the last `days_back`
    /// days, newest first, optionally narrowed by a provider search `query`
    async fn fetch_recent_messages(
        &self,
        max_count: usize,
        days_back: u32,
        query: &str,
    ) -> Result<Vec<EmailMessage>, MailError>;
}
