//! Hand-written port doubles shared by service tests

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use domain::{
    Deadline, EmailId, EmailMessage, EventRef, ProcessedEmailRecord, ProcessedOutcome,
    ProcessingState, TrackerError, UserId,
};
use parking_lot::Mutex;

use crate::{
    error::ApplicationError,
    ports::{
        CalendarError, CalendarPort, ClaimOutcome, DEFAULT_PENDING_LEASE, MailError, MailPort,
        ProcessedEmailStore, lease_cutoff,
    },
};

pub struct MemoryStore {
    records: Mutex<HashMap<(UserId, EmailId), ProcessedEmailRecord>>,
    fail_claims: bool,
    fail_rollbacks: bool,
    pending_lease: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            records: Mutex::default(),
            fail_claims: false,
            fail_rollbacks: false,
            pending_lease: DEFAULT_PENDING_LEASE,
        }
    }
}

impl MemoryStore {
    /// Store whose status and claim calls fail
    pub fn failing() -> Self {
        Self {
            fail_claims: true,
            ..Self::default()
        }
    }

    /// Store whose rollbacks fail
    pub fn failing_rollbacks(mut self) -> Self {
        self.fail_rollbacks = true;
        self
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.pending_lease = lease;
        self
    }

    pub fn state(&self, user_id: &UserId, email_id: &str) -> ProcessingState {
        let key = (user_id.clone(), EmailId::new(email_id).unwrap());
        self.records
            .lock()
            .get(&key)
            .map_or(ProcessingState::Unseen, |r| r.state)
    }
}

#[async_trait]
impl ProcessedEmailStore for MemoryStore {
    async fn get(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<Option<ProcessedEmailRecord>, ApplicationError> {
        Ok(self
            .records
            .lock()
            .get(&(user_id.clone(), email_id.clone()))
            .cloned())
    }

    async fn claim(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<ClaimOutcome, ApplicationError> {
        if self.fail_claims {
            return Err(ApplicationError::Internal("store offline".to_string()));
        }
        let now = Utc::now();
        let stale_before = lease_cutoff(now, self.pending_lease);
        let mut records = self.records.lock();
        let record = records
            .entry((user_id.clone(), email_id.clone()))
            .or_insert_with(|| ProcessedEmailRecord::new(user_id.clone(), email_id.clone(), now));
        Ok(match record.state {
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
        })
    }

    async fn commit(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
        outcome: &ProcessedOutcome,
    ) -> Result<(), ApplicationError> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(&(user_id.clone(), email_id.clone()))
            .ok_or_else(|| ApplicationError::NotFound(email_id.to_string()))?;
        record.commit(outcome.clone(), Utc::now())?;
        Ok(())
    }

    async fn rollback(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<(), ApplicationError> {
        if self.fail_rollbacks {
            return Err(ApplicationError::Internal("store offline".to_string()));
        }
        let mut records = self.records.lock();
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
        Ok(self
            .records
            .lock()
            .values()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn clear_user(&self, user_id: &UserId) -> Result<usize, ApplicationError> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|(user, _), _| user != user_id);
        Ok(before - records.len())
    }
}

#[derive(Default)]
pub struct FakeCalendar {
    pub titles: Vec<String>,
    pub fail_listing: bool,
    /// Number of upcoming create calls that fail
    pub failing_creates: Mutex<usize>,
    pub create_delay: Option<Duration>,
    pub created: Mutex<Vec<Deadline>>,
}

impl FakeCalendar {
    pub fn with_titles(titles: &[&str]) -> Self {
        Self {
            titles: titles.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }
}

#[async_trait]
impl CalendarPort for FakeCalendar {
    async fn list_existing_titles(
        &self,
        _lookahead_days: u32,
    ) -> Result<Vec<String>, CalendarError> {
        if self.fail_listing {
            return Err(CalendarError::ServiceUnavailable);
        }
        Ok(self.titles.clone())
    }

    async fn create_event(&self, deadline: &Deadline) -> Result<EventRef, CalendarError> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        {
            let mut failing = self.failing_creates.lock();
            if *failing > 0 {
                *failing -= 1;
                return Err(CalendarError::OperationFailed("quota exceeded".to_string()));
            }
        }
        let mut created = self.created.lock();
        created.push(deadline.clone());
        Ok(EventRef::new(format!("evt-{}", created.len())))
    }
}

#[derive(Default)]
pub struct FakeMailbox {
    pub messages: Vec<EmailMessage>,
    pub fail: bool,
}

impl FakeMailbox {
    pub fn new(messages: Vec<EmailMessage>) -> Self {
        Self {
            messages,
            fail: false,
        }
    }
}

#[async_trait]
impl MailPort for FakeMailbox {
    async fn fetch_recent_messages(
        &self,
        max_count: usize,
        _days_back: u32,
        _query: &str,
    ) -> Result<Vec<EmailMessage>, MailError> {
        if self.fail {
            return Err(MailError::ServiceUnavailable);
        }
        Ok(self.messages.iter().take(max_count).cloned().collect())
    }
}
