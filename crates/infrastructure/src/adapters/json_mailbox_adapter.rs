//! JSON mailbox adapter - Implements MailPort over a local JSON export
//!
//! The file holds a JSON array of messages:
//!
//! ```json
//! [{"id": "m1", "subject": "...", "body": "...", "sender": "...",
//!   "received_at": "2026-01-04T09:30:00Z"}]
//! ```
//!
//! Messages without an id or subject are passed through unchanged so the
//! scan can count them as malformed.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use application::ports::{ClockPort, MailError, MailPort};
use async_trait::async_trait;
use chrono::Duration;
use domain::EmailMessage;
use tracing::{debug, instrument};

/// Mailbox backed by a JSON file
pub struct JsonMailboxAdapter {
    path: PathBuf,
    clock: Arc<dyn ClockPort>,
}

impl fmt::Debug for JsonMailboxAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonMailboxAdapter")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl JsonMailboxAdapter {
    /// Create an adapter reading `path`, judging message age against `clock`
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every message in the file, unfiltered
    pub async fn load_all(&self) -> Result<Vec<EmailMessage>, MailError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MailError::OperationFailed(format!(
                    "Mailbox file not found: {}",
                    self.path.display()
                ))
            } else {
                MailError::OperationFailed(e.to_string())
            }
        })?;

        serde_json::from_str(&raw)
            .map_err(|e| MailError::OperationFailed(format!("Invalid mailbox file: {e}")))
    }
}

/// Case-insensitive substring match over subject, body and sender
fn matches_query(message: &EmailMessage, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    [&message.subject, &message.body, &message.sender]
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
}

#[async_trait]
impl MailPort for JsonMailboxAdapter {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch_recent_messages(
        &self,
        max_count: usize,
        days_back: u32,
        query: &str,
    ) -> Result<Vec<EmailMessage>, MailError> {
        let all = self.load_all().await?;
        let total = all.len();

        // A zero-day window disables the age filter.
        let cutoff = (days_back > 0).then(|| self.clock.now() - Duration::days(i64::from(days_back)));

        let mut messages: Vec<EmailMessage> = all
            .into_iter()
            .filter(|m| match (cutoff, m.received_at) {
                (Some(cutoff), Some(received)) => received >= cutoff,
                _ => true,
            })
            .filter(|m| matches_query(m, query))
            .collect();

        // Newest first; messages without a timestamp keep file order at the end.
        messages.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        messages.truncate(max_count);

        debug!(total, returned = messages.len(), "Loaded mailbox messages");
        Ok(messages)
    }
}
