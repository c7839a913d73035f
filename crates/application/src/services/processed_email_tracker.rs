//! Processed email tracker
//!
//! Single source of truth for whether an email's deadline has already been
//! acted on. Wraps the store port with logging and a state lookup that
//! treats unknown emails as unseen.

use std::{fmt, sync::Arc};

use domain::{EmailId, ProcessedEmailRecord, ProcessedOutcome, ProcessingState, UserId};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::ApplicationError,
    ports::{ClaimOutcome, ProcessedEmailStore},
};

/// Claim/commit/rollback front for a [`ProcessedEmailStore`]
#[derive(Clone)]
pub struct ProcessedEmailTracker {
    store: Arc<dyn ProcessedEmailStore>,
}

impl fmt::Debug for ProcessedEmailTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessedEmailTracker").finish_non_exhaustive()
    }
}

impl ProcessedEmailTracker {
    pub fn new(store: Arc<dyn ProcessedEmailStore>) -> Self {
        Self { store }
    }

    /// Current state; `Unseen` when there is no record
    #[instrument(skip(self), fields(user_id = %user_id, email_id = %email_id))]
    pub async fn status(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<ProcessingState, ApplicationError> {
        let state = self
            .store
            .get(user_id, email_id)
            .await?
            .map_or(ProcessingState::Unseen, |r| r.state);
        debug!(%state, "Looked up processed-email state");
        Ok(state)
    }

    /// Try to take ownership of the email's create action
    #[instrument(skip(self), fields(user_id = %user_id, email_id = %email_id))]
    pub async fn claim(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<ClaimOutcome, ApplicationError> {
        let outcome = self.store.claim(user_id, email_id).await?;
        debug!(?outcome, "Claim attempted");
        Ok(outcome)
    }

    /// Record the created event
    #[instrument(skip(self, outcome), fields(user_id = %user_id, email_id = %email_id))]
    pub async fn commit(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
        outcome: &ProcessedOutcome,
    ) -> Result<(), ApplicationError> {
        self.store.commit(user_id, email_id, outcome).await?;
        info!(event_ref = %outcome.event_ref, "Processed email committed");
        Ok(())
    }

    /// Release a claim so a later scan can retry
    #[instrument(skip(self), fields(user_id = %user_id, email_id = %email_id))]
    pub async fn rollback(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<(), ApplicationError> {
        if let Err(e) = self.store.rollback(user_id, email_id).await {
            warn!(error = %e, "Failed to roll back processed email");
            return Err(e);
        }
        info!("Processed email rolled back");
        Ok(())
    }

    /// All records of a user
    pub async fn records_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ProcessedEmailRecord>, ApplicationError> {
        self.store.list_for_user(user_id).await
    }

    /// Forget everything about a user
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn reset_user(&self, user_id: &UserId) -> Result<usize, ApplicationError> {
        let removed = self.store.clear_user(user_id).await?;
        info!(removed, "Cleared processed-email records");
        Ok(removed)
    }
}
