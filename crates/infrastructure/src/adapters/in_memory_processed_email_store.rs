//! In-memory processed-email store adapter
//!
//! Implements `ProcessedEmailStore` on a shared map. State lives as long as
//! the process; use `SqliteProcessedEmailStore` for durable tracking.

use std::{collections::HashMap, sync::Arc, time::Duration};

use application::{
    error::ApplicationError,
    ports::{ClaimOutcome, DEFAULT_PENDING_LEASE, ProcessedEmailStore, lease_cutoff},
};
use async_trait::async_trait;
use chrono::Utc;
use domain::{
    EmailId, ProcessedEmailRecord, ProcessedOutcome, ProcessingState, TrackerError, UserId,
};
use parking_lot::RwLock;
use tracing::debug;

type RecordKey = (UserId, EmailId);

/// In-memory implementation of processed-email tracking
#[derive(Debug)]
pub struct InMemoryProcessedEmailStore {
    records: Arc<RwLock<HashMap<RecordKey, ProcessedEmailRecord>>>,
    pending_lease: Duration,
}

impl Default for InMemoryProcessedEmailStore {
    fn default() -> Self {
        Self {
            records: Arc::default(),
            pending_lease: DEFAULT_PENDING_LEASE,
        }
    }
}

impl InMemoryProcessedEmailStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Let pending claims older than `lease` be claimed again
    #[must_use]
    pub const fn with_pending_lease(mut self, lease: Duration) -> Self {
        self.pending_lease = lease;
        self
    }

    /// Number of tracked records across all users
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no record is tracked
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Clone for InMemoryProcessedEmailStore {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            pending_lease: self.pending_lease,
        }
    }
}

#[async_trait]
impl ProcessedEmailStore for InMemoryProcessedEmailStore {
    async fn get(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<Option<ProcessedEmailRecord>, ApplicationError> {
        let key = (user_id.clone(), email_id.clone());
        Ok(self.records.read().get(&key).cloned())
    }

    async fn claim(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<ClaimOutcome, ApplicationError> {
        let now = Utc::now();
        let stale_before = lease_cutoff(now, self.pending_lease);
        let mut records = self.records.write();
        let record = records
            .entry((user_id.clone(), email_id.clone()))
            .or_insert_with(|| ProcessedEmailRecord::new(user_id.clone(), email_id.clone(), now));

        let outcome = match record.state {
            ProcessingState::Unseen => {
                record.claim(now)?;
                ClaimOutcome::Claimed
            },
            ProcessingState::Pending if record.is_expired_claim(stale_before) => {
                record.claim_or_take_over(now, stale_before)?;
                ClaimOutcome::Claimed
            },
            ProcessingState::Pending => ClaimOutcome::InFlight,
            ProcessingState::Created => ClaimOutcome::AlreadyCreated,
        };
        debug!(user_id = %user_id, email_id = %email_id, ?outcome, "Claim attempted");
        Ok(outcome)
    }

    async fn commit(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
        outcome: &ProcessedOutcome,
    ) -> Result<(), ApplicationError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&(user_id.clone(), email_id.clone()))
            .ok_or(TrackerError::InvalidTransition {
                from: ProcessingState::Unseen,
                to: ProcessingState::Created,
            })?;
        record.commit(outcome.clone(), Utc::now())?;
        Ok(())
    }

    async fn rollback(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<(), ApplicationError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&(user_id.clone(), email_id.clone()))
            .ok_or(TrackerError::InvalidTransition {
                from: ProcessingState::Unseen,
                to: ProcessingState::Unseen,
            })?;
        record.rollback(Utc::now())?;
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ProcessedEmailRecord>, ApplicationError> {
        let mut records: Vec<_> = self
            .records
            .read()
            .values()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.email_id.as_str().cmp(b.email_id.as_str()))
        });
        Ok(records)
    }

    async fn clear_user(&self, user_id: &UserId) -> Result<usize, ApplicationError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|(user, _), _| user != user_id);
        Ok(before - records.len())
    }
}
