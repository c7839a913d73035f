//! Deadline sync service
//!
//! Runs one scan over a user's recent mail: extracts at most one deadline per
//! email, filters out emails without a usable deadline, already-processed
//! emails and calendar duplicates, and drives the claim -> create ->
//! commit/rollback protocol for the rest.
//!
//! Concurrent scans of the same user serialize their check-and-claim step on
//! a per-user lock; the create call itself runs outside the lock.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use chrono::NaiveDate;
use domain::{Deadline, EmailId, EventRef, ProcessedOutcome, ProcessingState, UserId};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::ApplicationError,
    extraction::{DeadlineExtractor, DeadlinePolicy},
    ports::{CalendarError, CalendarPort, ClaimOutcome, ClockPort, MailError, MailPort,
        ProcessedEmailStore},
    services::{
        duplicate_guard::CalendarTitleSet,
        processed_email_tracker::ProcessedEmailTracker,
        scan_report::{
            CreateFailure, DEFAULT_DAYS_BACK, DEFAULT_MAX_EMAILS, ScanRequest, ScanResult,
        },
    },
};

/// Operational knobs of the sync service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Default message count for requests built by [`SyncSettings::request_for`]
    pub max_emails: usize,
    /// Default look-back window for requests built by [`SyncSettings::request_for`]
    pub days_back: u32,
    /// How far ahead existing calendar titles are read
    pub lookahead_days: u32,
    /// Upper bound for one create call
    pub create_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_emails: DEFAULT_MAX_EMAILS,
            days_back: DEFAULT_DAYS_BACK,
            lookahead_days: 365,
            create_timeout: Duration::from_secs(30),
        }
    }
}

impl SyncSettings {
    /// Request for `user_id` using these defaults
    pub fn request_for(&self, user_id: UserId) -> ScanRequest {
        ScanRequest::new(user_id)
            .with_max_emails(self.max_emails)
            .with_days_back(self.days_back)
    }
}

/// State shared by all scans of one user
#[derive(Debug, Default)]
struct UserScanState {
    /// Titles of deadlines claimed or created by this service
    claimed_titles: CalendarTitleSet,
}

type SharedUserState = Arc<tokio::sync::Mutex<UserScanState>>;

/// Result of the check-and-claim step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Claimed,
    DuplicateId,
    DuplicateTitle,
}

/// Result of the create step
#[derive(Debug)]
enum CreateOutcome {
    Created(EventRef),
    Failed(CalendarError),
    TimedOut,
    Cancelled,
}

/// Orchestrates deadline extraction and calendar sync
pub struct DeadlineSyncService {
    mail: Arc<dyn MailPort>,
    calendar: Arc<dyn CalendarPort>,
    tracker: ProcessedEmailTracker,
    clock: Arc<dyn ClockPort>,
    extractor: DeadlineExtractor,
    settings: SyncSettings,
    user_states: parking_lot::Mutex<HashMap<UserId, SharedUserState>>,
}

impl fmt::Debug for DeadlineSyncService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadlineSyncService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl DeadlineSyncService {
    /// Create a service with the default policy and settings
    pub fn new(
        mail: Arc<dyn MailPort>,
        calendar: Arc<dyn CalendarPort>,
        store: Arc<dyn ProcessedEmailStore>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            mail,
            calendar,
            tracker: ProcessedEmailTracker::new(store),
            clock,
            extractor: DeadlineExtractor::default(),
            settings: SyncSettings::default(),
            user_states: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Use a custom date policy
    #[must_use]
    pub fn with_policy(mut self, policy: DeadlinePolicy) -> Self {
        self.extractor = DeadlineExtractor::new(policy);
        self
    }

    /// Use custom operational settings
    #[must_use]
    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub const fn tracker(&self) -> &ProcessedEmailTracker {
        &self.tracker
    }

    pub const fn extractor(&self) -> &DeadlineExtractor {
        &self.extractor
    }

    /// Run one scan to completion
    pub async fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ApplicationError> {
        self.scan_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Run one scan, stopping early when `cancel` fires
    ///
    /// Fails only when the mailbox cannot be read. Everything else is
    /// reported per email in the returned [`ScanResult`].
    #[instrument(skip(self, cancel), fields(user_id = %request.user_id))]
    pub async fn scan_with_cancellation(
        &self,
        request: &ScanRequest,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, ApplicationError> {
        let today = self.clock.today();
        info!(
            max_emails = request.max_emails,
            days_back = request.days_back,
            %today,
            "Starting deadline scan"
        );

        let messages = self
            .mail
            .fetch_recent_messages(request.max_emails, request.days_back, &request.query)
            .await
            .map_err(map_mail_error)?;

        let mut result = ScanResult::default();
        let existing_titles = match self
            .calendar
            .list_existing_titles(self.settings.lookahead_days)
            .await
        {
            Ok(titles) => Some(CalendarTitleSet::from_titles(titles)),
            Err(e) => {
                warn!(error = %e, "Calendar title lookup failed, skipping duplicate title check");
                result.summary.title_check_skipped = true;
                None
            },
        };
        let user_state = self.user_state(&request.user_id);

        for email in messages {
            if cancel.is_cancelled() {
                info!("Scan cancelled");
                result.aborted = true;
                break;
            }

            let email_id = match email.validate() {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed email");
                    result.summary.malformed += 1;
                    continue;
                },
            };

            let Some(deadline) = self.extractor.extract_deadline(&email, &email_id, today) else {
                debug!(email_id = %email_id, "No deadline found");
                result.summary.scanned += 1;
                result.summary.no_deadline += 1;
                continue;
            };

            if deadline.is_expired(today) {
                debug!(email_id = %email_id, date = %deadline.date, "Deadline expired");
                result.summary.scanned += 1;
                result.summary.expired += 1;
                continue;
            }

            let gate = {
                let mut state = user_state.lock().await;
                self.check_and_claim(
                    &request.user_id,
                    &deadline,
                    existing_titles.as_ref(),
                    &mut state,
                )
                .await
            };

            match gate {
                Ok(Gate::Claimed) => {},
                Ok(Gate::DuplicateId) => {
                    debug!(email_id = %email_id, "Email already processed");
                    result.summary.scanned += 1;
                    result.summary.duplicate_id += 1;
                    continue;
                },
                Ok(Gate::DuplicateTitle) => {
                    debug!(email_id = %email_id, title = %deadline.title, "Duplicate calendar title");
                    result.summary.scanned += 1;
                    result.summary.duplicate_title += 1;
                    continue;
                },
                Err(e) => {
                    warn!(email_id = %email_id, error = %e, "Processed-email store failed");
                    result.summary.tracker_errors += 1;
                    result.failures.push(CreateFailure {
                        email_id,
                        title: deadline.title.clone(),
                        reason: e.to_string(),
                        retryable: true,
                    });
                    continue;
                },
            }

            result.summary.scanned += 1;
            result.summary.emitted += 1;

            let guard = ClaimGuard::new(
                self.tracker.clone(),
                request.user_id.clone(),
                email_id.clone(),
                deadline.title.clone(),
                Arc::clone(&user_state),
            );

            let stop = match self.create_event(&deadline, cancel).await {
                CreateOutcome::Created(event_ref) => {
                    match self
                        .commit(&request.user_id, &deadline, event_ref, today)
                        .await
                    {
                        Ok(()) => {
                            guard.disarm();
                            result.deadlines.push(deadline);
                        },
                        Err(e) => {
                            if !guard.release().await {
                                result.summary.rollback_failed += 1;
                            }
                            result.summary.create_failed += 1;
                            result.failures.push(CreateFailure {
                                email_id,
                                title: deadline.title,
                                reason: format!("event created but not recorded: {e}"),
                                retryable: false,
                            });
                        },
                    }
                    false
                },
                CreateOutcome::Failed(e) => {
                    warn!(email_id = %email_id, error = %e, "Calendar create failed");
                    if !guard.release().await {
                        result.summary.rollback_failed += 1;
                    }
                    result.summary.create_failed += 1;
                    result.failures.push(CreateFailure {
                        email_id,
                        title: deadline.title,
                        reason: e.to_string(),
                        retryable: e.is_retryable(),
                    });
                    false
                },
                CreateOutcome::TimedOut => {
                    warn!(email_id = %email_id, "Calendar create timed out");
                    if !guard.release().await {
                        result.summary.rollback_failed += 1;
                    }
                    result.summary.create_failed += 1;
                    result.failures.push(CreateFailure {
                        email_id,
                        title: deadline.title,
                        reason: "calendar create timed out".to_string(),
                        retryable: true,
                    });
                    false
                },
                CreateOutcome::Cancelled => {
                    info!(email_id = %email_id, "Scan cancelled during create");
                    if !guard.release().await {
                        result.summary.rollback_failed += 1;
                    }
                    result.summary.create_failed += 1;
                    result.failures.push(CreateFailure {
                        email_id,
                        title: deadline.title,
                        reason: "scan cancelled".to_string(),
                        retryable: true,
                    });
                    true
                },
            };

            if stop {
                result.aborted = true;
                break;
            }
        }

        drop(user_state);
        self.release_user_state(&request.user_id);

        let summary = &result.summary;
        info!(
            scanned = summary.scanned,
            emitted = summary.emitted,
            no_deadline = summary.no_deadline,
            expired = summary.expired,
            duplicate_id = summary.duplicate_id,
            duplicate_title = summary.duplicate_title,
            create_failed = summary.create_failed,
            rollback_failed = summary.rollback_failed,
            malformed = summary.malformed,
            aborted = result.aborted,
            "Deadline scan finished"
        );
        Ok(result)
    }

    /// Duplicate-id and duplicate-title checks followed by the claim
    ///
    /// Must run under the user's lock so no other scan of the same user can
    /// interleave between check and claim.
    async fn check_and_claim(
        &self,
        user_id: &UserId,
        deadline: &Deadline,
        existing_titles: Option<&CalendarTitleSet>,
        state: &mut UserScanState,
    ) -> Result<Gate, ApplicationError> {
        let is_duplicate_title = |state: &UserScanState| {
            existing_titles.is_some_and(|titles| titles.matches(&deadline.title))
                || state.claimed_titles.matches(&deadline.title)
        };

        match self.tracker.status(user_id, &deadline.email_id).await? {
            ProcessingState::Created => Ok(Gate::DuplicateId),
            ProcessingState::Pending => {
                // Only succeeds once the other scan's lease has expired
                if !self.tracker.claim(user_id, &deadline.email_id).await?.is_claimed() {
                    return Ok(Gate::DuplicateId);
                }
                warn!(email_id = %deadline.email_id, "Took over an expired claim");
                if is_duplicate_title(&*state) {
                    self.tracker.rollback(user_id, &deadline.email_id).await?;
                    return Ok(Gate::DuplicateTitle);
                }
                state.claimed_titles.insert(&deadline.title);
                Ok(Gate::Claimed)
            },
            ProcessingState::Unseen => {
                if is_duplicate_title(&*state) {
                    return Ok(Gate::DuplicateTitle);
                }
                match self.tracker.claim(user_id, &deadline.email_id).await? {
                    ClaimOutcome::Claimed => {
                        state.claimed_titles.insert(&deadline.title);
                        Ok(Gate::Claimed)
                    },
                    ClaimOutcome::InFlight | ClaimOutcome::AlreadyCreated => Ok(Gate::DuplicateId),
                }
            },
        }
    }

    async fn create_event(&self, deadline: &Deadline, cancel: &CancellationToken) -> CreateOutcome {
        let create = tokio::time::timeout(
            self.settings.create_timeout,
            self.calendar.create_event(deadline),
        );
        tokio::select! {
            biased;
            () = cancel.cancelled() => CreateOutcome::Cancelled,
            res = create => match res {
                Ok(Ok(event_ref)) => CreateOutcome::Created(event_ref),
                Ok(Err(e)) => CreateOutcome::Failed(e),
                Err(_) => CreateOutcome::TimedOut,
            },
        }
    }

    async fn commit(
        &self,
        user_id: &UserId,
        deadline: &Deadline,
        event_ref: EventRef,
        today: NaiveDate,
    ) -> Result<(), ApplicationError> {
        debug!(email_id = %deadline.email_id, %today, "Committing created deadline");
        let outcome = ProcessedOutcome {
            event_ref,
            deadline_date: deadline.date,
        };
        self.tracker
            .commit(user_id, &deadline.email_id, &outcome)
            .await
    }

    fn user_state(&self, user_id: &UserId) -> SharedUserState {
        Arc::clone(self.user_states.lock().entry(user_id.clone()).or_default())
    }

    /// Forget a user's shared state once no scan or pending rollback holds it
    fn release_user_state(&self, user_id: &UserId) {
        let mut states = self.user_states.lock();
        if states.get(user_id).is_some_and(|s| Arc::strong_count(s) == 1) {
            states.remove(user_id);
        }
    }

    /// Users with a scan in progress
    pub fn active_users(&self) -> usize {
        self.user_states.lock().len()
    }
}

/// Rolls a claim back if the scan is dropped mid-create
struct ClaimGuard {
    tracker: ProcessedEmailTracker,
    user_id: UserId,
    email_id: EmailId,
    title: String,
    state: SharedUserState,
    armed: bool,
}

impl ClaimGuard {
    const fn new(
        tracker: ProcessedEmailTracker,
        user_id: UserId,
        email_id: EmailId,
        title: String,
        state: SharedUserState,
    ) -> Self {
        Self {
            tracker,
            user_id,
            email_id,
            title,
            state,
            armed: true,
        }
    }

    /// The claim was committed; nothing to undo
    fn disarm(mut self) {
        self.armed = false;
    }

    /// Roll the claim back now
    ///
    /// # Returns
    /// Whether the record is unseen again. On failure the record stays
    /// pending until its lease expires.
    async fn release(mut self) -> bool {
        self.armed = false;
        self.state.lock().await.claimed_titles.remove(&self.title);
        match self.tracker.rollback(&self.user_id, &self.email_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(email_id = %self.email_id, error = %e, "Rollback failed");
                false
            },
        }
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            warn!(email_id = %self.email_id, "No runtime to roll back abandoned claim");
            return;
        };
        let tracker = self.tracker.clone();
        let user_id = self.user_id.clone();
        let email_id = self.email_id.clone();
        let title = std::mem::take(&mut self.title);
        let state = Arc::clone(&self.state);
        handle.spawn(async move {
            state.lock().await.claimed_titles.remove(&title);
            if let Err(e) = tracker.rollback(&user_id, &email_id).await {
                warn!(email_id = %email_id, error = %e, "Rollback of abandoned claim failed");
            }
        });
    }
}

fn map_mail_error(err: MailError) -> ApplicationError {
    match err {
        MailError::ServiceUnavailable => {
            ApplicationError::ExternalService("Mail service unavailable".to_string())
        },
        MailError::AuthenticationFailed => {
            ApplicationError::NotAuthorized("Mail authentication failed".to_string())
        },
        MailError::InvalidQuery(query) => {
            ApplicationError::Configuration(format!("Invalid mail query: {query}"))
        },
        MailError::OperationFailed(msg) => ApplicationError::ExternalService(msg),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use domain::{DateSource, EmailMessage};

    use super::*;
    use crate::{
        ports::FixedClock,
        test_support::{FakeCalendar, FakeMailbox, MemoryStore},
    };

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn user() -> UserId {
        UserId::new("alice@example.com").unwrap()
    }

    fn sample_mailbox() -> Vec<EmailMessage> {
        vec![
            EmailMessage::new("m1", "Software Engineer Position - Apply by Jan 20, 2026"),
            EmailMessage::new("m2", "Coding challenge")
                .with_body("Please finish the assessment by January 10, 2026 at 5pm."),
            EmailMessage::new("m3", "Newsletter").with_body("Nothing to see here."),
            EmailMessage::new("m4", "Old news").with_body("The fair was on 2025-12-20."),
        ]
    }

    struct Harness {
        store: Arc<MemoryStore>,
        calendar: Arc<FakeCalendar>,
        service: DeadlineSyncService,
    }

    fn harness(messages: Vec<EmailMessage>, calendar: FakeCalendar, store: MemoryStore) -> Harness {
        let store = Arc::new(store);
        let calendar = Arc::new(calendar);
        let service = DeadlineSyncService::new(
            Arc::new(FakeMailbox::new(messages)),
            Arc::clone(&calendar) as Arc<dyn CalendarPort>,
            Arc::clone(&store) as Arc<dyn ProcessedEmailStore>,
            Arc::new(FixedClock::at_date(ymd(2026, 1, 5))),
        );
        Harness {
            store,
            calendar,
            service,
        }
    }

    fn default_harness(messages: Vec<EmailMessage>) -> Harness {
        harness(messages, FakeCalendar::default(), MemoryStore::default())
    }

    #[tokio::test]
    async fn scan_emits_valid_deadlines_and_counts_the_rest() {
        let h = default_harness(sample_mailbox());
        let result = h.service.scan(&ScanRequest::new(user())).await.unwrap();

        assert_eq!(result.summary.scanned, 4);
        assert_eq!(result.summary.emitted, 2);
        assert_eq!(result.summary.no_deadline, 1);
        assert_eq!(result.summary.expired, 1);
        assert!(result.summary.is_consistent());
        assert!(!result.aborted);

        assert_eq!(result.deadlines.len(), 2);
        assert_eq!(h.calendar.created_count(), 2);
        assert_eq!(h.store.state(&user(), "m1"), ProcessingState::Created);
        assert_eq!(h.store.state(&user(), "m2"), ProcessingState::Created);
    }

    #[tokio::test]
    async fn emitted_deadlines_are_never_in_the_past() {
        let h = default_harness(sample_mailbox());
        let result = h.service.scan(&ScanRequest::new(user())).await.unwrap();
        assert!(result.deadlines.iter().all(|d| d.date >= ymd(2026, 1, 5)));
    }

    #[tokio::test]
    async fn second_scan_is_idempotent() {
        let h = default_harness(sample_mailbox());
        let request = ScanRequest::new(user());
        h.service.scan(&request).await.unwrap();

        let second = h.service.scan(&request).await.unwrap();
        assert_eq!(second.summary.emitted, 0);
        assert_eq!(second.summary.duplicate_id, 2);
        assert!(second.summary.is_consistent());
        assert_eq!(h.calendar.created_count(), 2);
    }

    #[tokio::test]
    async fn body_date_takes_precedence_over_subject() {
        let h = default_harness(vec![
            EmailMessage::new("m1", "Software Engineer - Deadline Dec 15")
                .with_body("Submit by January 10, 2026"),
        ]);
        let result = h.service.scan(&ScanRequest::new(user())).await.unwrap();
        let deadline = &result.deadlines[0];
        assert_eq!(deadline.date, ymd(2026, 1, 10));
        assert_eq!(deadline.source, DateSource::Body);
    }

    #[tokio::test]
    async fn existing_calendar_title_blocks_creation() {
        let calendar = FakeCalendar::with_titles(&["Job Deadline: Software Engineer Position"]);
        let h = harness(
            vec![EmailMessage::new("m1", "Software Engineer Position")
                .with_body("Apply by Jan 20, 2026")],
            calendar,
            MemoryStore::default(),
        );
        let result = h.service.scan(&ScanRequest::new(user())).await.unwrap();

        assert_eq!(result.summary.duplicate_title, 1);
        assert_eq!(result.summary.emitted, 0);
        assert_eq!(h.calendar.created_count(), 0);
        assert_eq!(h.store.state(&user(), "m1"), ProcessingState::Unseen);
    }

    #[tokio::test]
    async fn same_subject_twice_in_one_batch_creates_once() {
        let h = default_harness(vec![
            EmailMessage::new("m1", "Data Analyst role").with_body("Apply by Jan 20, 2026"),
            EmailMessage::new("m2", "Data Analyst role").with_body("Reminder: Jan 20, 2026"),
        ]);
        let result = h.service.scan(&ScanRequest::new(user())).await.unwrap();
        assert_eq!(result.summary.emitted, 1);
        assert_eq!(result.summary.duplicate_title, 1);
        assert_eq!(h.calendar.created_count(), 1);
    }

    #[tokio::test]
    async fn failed_create_rolls_back_and_is_retried_next_scan() {
        let calendar = FakeCalendar {
            failing_creates: parking_lot::Mutex::new(1),
            ..FakeCalendar::default()
        };
        let h = harness(
            vec![EmailMessage::new("m1", "Apply by Jan 20, 2026")],
            calendar,
            MemoryStore::default(),
        );
        let request = ScanRequest::new(user());

        let first = h.service.scan(&request).await.unwrap();
        assert_eq!(first.summary.emitted, 1);
        assert_eq!(first.summary.create_failed, 1);
        assert!(first.deadlines.is_empty());
        assert_eq!(first.failures.len(), 1);
        assert!(first.failures[0].retryable);
        assert_eq!(h.store.state(&user(), "m1"), ProcessingState::Unseen);

        let second = h.service.scan(&request).await.unwrap();
        assert_eq!(second.summary.emitted, 1);
        assert_eq!(second.summary.create_failed, 0);
        assert_eq!(h.store.state(&user(), "m1"), ProcessingState::Created);
    }

    #[tokio::test]
    async fn title_lookup_failure_degrades_gracefully() {
        let calendar = FakeCalendar {
            titles: vec!["Apply by Jan 20, 2026".to_string()],
            fail_listing: true,
            ..FakeCalendar::default()
        };
        let h = harness(
            vec![EmailMessage::new("m1", "Apply by Jan 20, 2026")],
            calendar,
            MemoryStore::default(),
        );
        let result = h.service.scan(&ScanRequest::new(user())).await.unwrap();
        assert!(result.summary.title_check_skipped);
        assert_eq!(result.summary.emitted, 1);
    }

    #[tokio::test]
    async fn malformed_emails_are_isolated() {
        let mut messages = sample_mailbox();
        messages.insert(0, EmailMessage::new("", "No id"));
        messages.push(EmailMessage::new("m9", "   "));
        let h = default_harness(messages);

        let result = h.service.scan(&ScanRequest::new(user())).await.unwrap();
        assert_eq!(result.summary.malformed, 2);
        assert_eq!(result.summary.scanned, 4);
        assert_eq!(result.summary.emitted, 2);
        assert!(result.summary.is_consistent());
    }

    #[tokio::test]
    async fn mailbox_failure_fails_the_scan() {
        let service = DeadlineSyncService::new(
            Arc::new(FakeMailbox {
                messages: Vec::new(),
                fail: true,
            }),
            Arc::new(FakeCalendar::default()),
            Arc::new(MemoryStore::default()),
            Arc::new(FixedClock::at_date(ymd(2026, 1, 5))),
        );
        let err = service.scan(&ScanRequest::new(user())).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn store_failure_is_counted_per_email() {
        let h = harness(sample_mailbox(), FakeCalendar::default(), MemoryStore::failing());
        let result = h.service.scan(&ScanRequest::new(user())).await.unwrap();

        assert_eq!(result.summary.tracker_errors, 2);
        assert_eq!(result.summary.emitted, 0);
        assert_eq!(result.failures.len(), 2);
        assert!(result.summary.is_consistent());
        assert_eq!(h.calendar.created_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_scans_create_each_email_once() {
        let calendar = FakeCalendar {
            create_delay: Some(Duration::from_millis(20)),
            ..FakeCalendar::default()
        };
        let h = harness(sample_mailbox(), calendar, MemoryStore::default());
        let request = ScanRequest::new(user());

        let (a, b) = tokio::join!(h.service.scan(&request), h.service.scan(&request));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(h.calendar.created_count(), 2);
        assert_eq!(a.summary.emitted + b.summary.emitted, 2);
        assert!(a.summary.is_consistent());
        assert!(b.summary.is_consistent());
    }

    #[tokio::test]
    async fn cancelled_before_start_creates_nothing() {
        let h = default_harness(sample_mailbox());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = h
            .service
            .scan_with_cancellation(&ScanRequest::new(user()), &cancel)
            .await
            .unwrap();
        assert!(result.aborted);
        assert_eq!(result.summary.scanned, 0);
        assert_eq!(h.calendar.created_count(), 0);
    }

    #[tokio::test]
    async fn cancellation_during_create_rolls_back() {
        let calendar = FakeCalendar {
            create_delay: Some(Duration::from_secs(5)),
            ..FakeCalendar::default()
        };
        let h = harness(
            vec![EmailMessage::new("m1", "Apply by Jan 20, 2026")],
            calendar,
            MemoryStore::default(),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = h
            .service
            .scan_with_cancellation(&ScanRequest::new(user()), &cancel)
            .await
            .unwrap();
        assert!(result.aborted);
        assert_eq!(result.summary.create_failed, 1);
        assert_eq!(h.store.state(&user(), "m1"), ProcessingState::Unseen);
    }

    #[tokio::test]
    async fn create_timeout_rolls_back_and_continues() {
        let calendar = FakeCalendar {
            create_delay: Some(Duration::from_secs(5)),
            ..FakeCalendar::default()
        };
        let h = harness(sample_mailbox(), calendar, MemoryStore::default());
        let service = h.service.with_settings(SyncSettings {
            create_timeout: Duration::from_millis(20),
            ..SyncSettings::default()
        });

        let result = service.scan(&ScanRequest::new(user())).await.unwrap();
        assert!(!result.aborted);
        assert_eq!(result.summary.scanned, 4);
        assert_eq!(result.summary.create_failed, 2);
        assert_eq!(result.summary.no_deadline, 1);
        assert_eq!(result.summary.expired, 1);
        assert_eq!(result.summary.rollback_failed, 0);
        assert!(result.failures.iter().all(|f| f.retryable));
        assert_eq!(h.store.state(&user(), "m1"), ProcessingState::Unseen);
        assert_eq!(h.store.state(&user(), "m2"), ProcessingState::Unseen);
        assert!(result.summary.is_consistent());
    }

    #[tokio::test]
    async fn expired_claim_from_dead_scan_is_created() {
        let h = harness(
            vec![EmailMessage::new("m1", "Apply by Jan 20, 2026")],
            FakeCalendar::default(),
            MemoryStore::default().with_lease(Duration::from_millis(20)),
        );
        let email_id = EmailId::new("m1").unwrap();
        let claimed = h.store.claim(&user(), &email_id).await.unwrap();
        assert!(claimed.is_claimed());

        tokio::time::sleep(Duration::from_millis(50)).await;

        let result = h.service.scan(&ScanRequest::new(user())).await.unwrap();
        assert_eq!(result.summary.emitted, 1);
        assert_eq!(result.summary.duplicate_id, 0);
        assert_eq!(h.calendar.created_count(), 1);
        assert_eq!(h.store.state(&user(), "m1"), ProcessingState::Created);
    }

    #[tokio::test]
    async fn live_claim_is_left_alone() {
        let h = default_harness(vec![EmailMessage::new("m1", "Apply by Jan 20, 2026")]);
        let email_id = EmailId::new("m1").unwrap();
        h.store.claim(&user(), &email_id).await.unwrap();

        let result = h.service.scan(&ScanRequest::new(user())).await.unwrap();
        assert_eq!(result.summary.duplicate_id, 1);
        assert_eq!(h.calendar.created_count(), 0);
        assert_eq!(h.store.state(&user(), "m1"), ProcessingState::Pending);
    }

    #[tokio::test]
    async fn failed_rollback_is_reported() {
        let calendar = FakeCalendar {
            failing_creates: parking_lot::Mutex::new(1),
            ..FakeCalendar::default()
        };
        let h = harness(
            vec![EmailMessage::new("m1", "Apply by Jan 20, 2026")],
            calendar,
            MemoryStore::default().failing_rollbacks(),
        );

        let result = h.service.scan(&ScanRequest::new(user())).await.unwrap();
        assert_eq!(result.summary.create_failed, 1);
        assert_eq!(result.summary.rollback_failed, 1);
        assert!(result.summary.is_consistent());
        // Left pending until the lease runs out
        assert_eq!(h.store.state(&user(), "m1"), ProcessingState::Pending);
    }

    #[tokio::test]
    async fn finished_scans_drop_user_state() {
        let h = default_harness(sample_mailbox());
        h.service.scan(&ScanRequest::new(user())).await.unwrap();
        h.service
            .scan(&ScanRequest::new(UserId::new("bob@example.com").unwrap()))
            .await
            .unwrap();
        assert_eq!(h.service.active_users(), 0);
    }

    #[tokio::test]
    async fn calendar_title_with_prefix_blocks_creation() {
        let subject = "Software Engineer Position - Application Deadline Dec 15";
        let calendar = FakeCalendar::with_titles(&[
            "Job Deadline: Software Engineer Position - Application Deadline Dec 15",
        ]);
        let h = harness(
            vec![EmailMessage::new("m1", subject)],
            calendar,
            MemoryStore::default(),
        );

        let result = h.service.scan(&ScanRequest::new(user())).await.unwrap();
        assert_eq!(result.summary.duplicate_title, 1);
        assert_eq!(result.summary.emitted, 0);
        assert_eq!(h.calendar.created_count(), 0);
    }

    #[tokio::test]
    async fn dropped_scan_releases_its_claim() {
        let calendar = FakeCalendar {
            create_delay: Some(Duration::from_secs(5)),
            ..FakeCalendar::default()
        };
        let h = harness(
            vec![EmailMessage::new("m1", "Apply by Jan 20, 2026")],
            calendar,
            MemoryStore::default(),
        );
        let request = ScanRequest::new(user());

        let dropped =
            tokio::time::timeout(Duration::from_millis(20), h.service.scan(&request)).await;
        assert!(dropped.is_err());

        for _ in 0..50 {
            if h.store.state(&user(), "m1") == ProcessingState::Unseen {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(h.store.state(&user(), "m1"), ProcessingState::Unseen);
    }

    #[test]
    fn settings_build_requests() {
        let settings = SyncSettings {
            max_emails: 10,
            days_back: 3,
            ..SyncSettings::default()
        };
        let request = settings.request_for(user());
        assert_eq!(request.max_emails, 10);
        assert_eq!(request.days_back, 3);
    }

    #[test]
    fn map_mail_error_variants() {
        assert!(matches!(
            map_mail_error(MailError::AuthenticationFailed),
            ApplicationError::NotAuthorized(_)
        ));
        assert!(matches!(
            map_mail_error(MailError::InvalidQuery("x".to_string())),
            ApplicationError::Configuration(_)
        ));
        assert!(matches!(
            map_mail_error(MailError::OperationFailed("x".to_string())),
            ApplicationError::ExternalService(_)
        ));
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        const SUBJECTS: [&str; 6] = [
            "Software Engineer Position - Apply by Jan 20, 2026",
            "Interview on January 12, 2026",
            "Newsletter",
            "Re: Apply by Jan 20, 2026",
            "Old fair 2025-12-01",
            "",
        ];
        const BODIES: [&str; 4] = [
            "",
            "Please respond by February 2, 2026 at 5pm.",
            "The fair was on 2025-12-20.",
            "Nothing to see here.",
        ];

        fn mailbox() -> impl Strategy<Value = Vec<EmailMessage>> {
            prop::collection::vec((0..SUBJECTS.len(), 0..BODIES.len()), 0..12).prop_map(|picks| {
                picks
                    .into_iter()
                    .enumerate()
                    .map(|(i, (s, b))| {
                        EmailMessage::new(format!("m{}", i % 5), SUBJECTS[s]).with_body(BODIES[b])
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn summary_always_adds_up(messages in mailbox()) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                let h = default_harness(messages);
                let request = ScanRequest::new(user());

                for _ in 0..2 {
                    let result = runtime.block_on(h.service.scan(&request)).unwrap();
                    prop_assert!(result.summary.is_consistent());
                    prop_assert_eq!(
                        result.deadlines.len(),
                        result.summary.emitted - result.summary.create_failed
                    );
                    prop_assert!(result.deadlines.iter().all(|d| d.date >= ymd(2026, 1, 5)));
                }
            }
        }
    }
}
