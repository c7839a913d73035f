//! Processed email store port
//!
//! Persistence for the per-user, per-email claim/commit state machine.
//! Every implementation must make `claim` an atomic compare-and-set so two
//! concurrent scans can never both own the same email.
//!
//! A claim is a lease: a pending record not touched for longer than the
//! store's lease belongs to a scan that died before commit or rollback, and
//! may be claimed again.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use domain::{EmailId, ProcessedEmailRecord, ProcessedOutcome, UserId};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// How long a pending claim blocks other scans
pub const DEFAULT_PENDING_LEASE: Duration = Duration::from_secs(15 * 60);

/// Pending claims last touched before this instant have expired
pub fn lease_cutoff(now: DateTime<Utc>, lease: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(lease)
        .ok()
        .and_then(|lease| now.checked_sub_signed(lease))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Result of trying to claim an email
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The caller now owns the email (`Unseen -> Pending`, or an expired
    /// pending claim was taken over)
    Claimed,
    /// Another scan holds a live claim
    InFlight,
    /// The email already produced an event
    AlreadyCreated,
}

impl ClaimOutcome {
    /// Whether the caller may proceed with the create action
    pub const fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed)
    }
}

/// Port for processed-email persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProcessedEmailStore: Send + Sync {
    /// Get the record for one email, `None` if never seen
    async fn get(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<Option<ProcessedEmailRecord>, ApplicationError>;

    /// Atomically move `Unseen -> Pending`, or renew a pending claim whose
    /// lease has expired
    async fn claim(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<ClaimOutcome, ApplicationError>;

    /// Move `Pending -> Created` and store the outcome
    ///
    /// Fails with a tracker error if the record is not pending.
    async fn commit(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
        outcome: &ProcessedOutcome,
    ) -> Result<(), ApplicationError>;

    /// Move `Pending -> Unseen`
    ///
    /// Fails with a tracker error if the record is not pending.
    async fn rollback(&self, user_id: &UserId, email_id: &EmailId)
    -> Result<(), ApplicationError>;

    /// All records of one user, most recently updated first
    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ProcessedEmailRecord>, ApplicationError>;

    /// Delete every record of one user
    ///
    /// # Returns
    /// Number of records removed
    async fn clear_user(&self, user_id: &UserId) -> Result<usize, ApplicationError>;
}
