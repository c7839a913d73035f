//! Email message entity - Immutable input to one scan

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{errors::DomainError, value_objects::EmailId};

/// Subject prefixes marking replies and forwards
const REPLY_FORWARD_PREFIXES: [&str; 3] = ["re:", "fwd:", "fw:"];

/// An email as delivered by the mail provider
///
/// Fields are kept raw so that one malformed message can be reported
/// without failing the whole batch; see [`EmailMessage::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Provider message identifier
    pub id: String,
    /// Subject line
    #[serde(default)]
    pub subject: String,
    /// Plain-text body (may be empty)
    #[serde(default)]
    pub body: String,
    /// Sender address or display name
    #[serde(default)]
    pub sender: String,
    /// When the provider received the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

impl EmailMessage {
    /// Create a message with an empty body and sender
    pub fn new(id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            body: String::new(),
            sender: String::new(),
            received_at: None,
        }
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the sender
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Set the receive time
    #[must_use]
    pub const fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = Some(received_at);
        self
    }

    /// Check the message carries the data a scan needs
    ///
    /// Returns the parsed identifier on success. A blank id or subject is
    /// reported as [`DomainError::MalformedEmail`].
    pub fn validate(&self) -> Result<EmailId, DomainError> {
        let id = EmailId::new(self.id.as_str())
            .map_err(|_| DomainError::malformed_email(&self.id, "missing message id"))?;
        if self.subject.trim().is_empty() {
            return Err(DomainError::malformed_email(&self.id, "missing subject"));
        }
        Ok(id)
    }

    /// Whether the subject marks a reply or a forward (`Re:`, `Fwd:`, `Fw:`)
    pub fn is_reply_or_forward(&self) -> bool {
        let subject = self.subject.trim_start().to_lowercase();
        REPLY_FORWARD_PREFIXES
            .iter()
            .any(|prefix| subject.starts_with(prefix))
    }
}
