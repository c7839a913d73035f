//! Processed email record - Tracks whether an email's deadline was acted on

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value_objects::{EmailId, EventRef, UserId};

/// Processing state of one email for one user
///
/// Legal transitions are `Unseen -> Pending -> Created` and
/// `Pending -> Unseen` (rollback). `Created` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    /// Never claimed, or rolled back after a failed create
    #[default]
    Unseen,
    /// Claimed by a scan, create in flight
    Pending,
    /// Calendar event exists
    Created,
}

impl ProcessingState {
    /// Check if this is a terminal state (no further changes possible)
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Created)
    }

    /// Storage label
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unseen => "unseen",
            Self::Pending => "pending",
            Self::Created => "created",
        }
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProcessingState {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unseen" => Ok(Self::Unseen),
            "pending" => Ok(Self::Pending),
            "created" => Ok(Self::Created),
            other => Err(TrackerError::UnknownState(other.to_string())),
        }
    }
}

/// What a committed email produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedOutcome {
    /// Event created on the calendar
    pub event_ref: EventRef,
    /// Date of the deadline the event represents
    pub deadline_date: NaiveDate,
}

/// Errors raised by illegal state transitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// Transition not allowed from the current state
    #[error("Invalid processed-email transition from {from} to {to}")]
    InvalidTransition {
        from: ProcessingState,
        to: ProcessingState,
    },

    /// Stored state label not recognised
    #[error("Unknown processing state: {0}")]
    UnknownState(String),
}

/// Per-user, per-email processing record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEmailRecord {
    /// Owner of the mailbox
    pub user_id: UserId,
    /// Email being tracked
    pub email_id: EmailId,
    /// Current state
    pub state: ProcessingState,
    /// Set once the record reaches `Created`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ProcessedOutcome>,
    /// When the state last changed
    pub updated_at: DateTime<Utc>,
}

impl ProcessedEmailRecord {
    /// Create an unseen record
    pub const fn new(user_id: UserId, email_id: EmailId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            email_id,
            state: ProcessingState::Unseen,
            outcome: None,
            updated_at: now,
        }
    }

    /// Move `Unseen -> Pending`
    pub fn claim(&mut self, now: DateTime<Utc>) -> Result<(), TrackerError> {
        self.transition(ProcessingState::Unseen, ProcessingState::Pending, now)
    }

    /// Whether this is a pending claim last touched before `stale_before`
    pub fn is_expired_claim(&self, stale_before: DateTime<Utc>) -> bool {
        self.state == ProcessingState::Pending && self.updated_at < stale_before
    }

    /// Claim the email, taking over a pending claim whose lease ran out
    ///
    /// A live pending claim is left alone and reported as an invalid
    /// `Pending -> Pending` transition.
    pub fn claim_or_take_over(
        &mut self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        if self.is_expired_claim(stale_before) {
            self.outcome = None;
            self.updated_at = now;
            return Ok(());
        }
        self.claim(now)
    }

    /// Move `Pending -> Created`, recording what was created
    pub fn commit(
        &mut self,
        outcome: ProcessedOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        self.transition(ProcessingState::Pending, ProcessingState::Created, now)?;
        self.outcome = Some(outcome);
        Ok(())
    }

    /// Move `Pending -> Unseen` after a failed or cancelled create
    pub fn rollback(&mut self, now: DateTime<Utc>) -> Result<(), TrackerError> {
        self.transition(ProcessingState::Pending, ProcessingState::Unseen, now)
    }

    fn transition(
        &mut self,
        expected: ProcessingState,
        to: ProcessingState,
        now: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        if self.state != expected {
            return Err(TrackerError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        self.updated_at = now;
        Ok(())
    }
}
