//! End-to-end scans over JSON mailbox/calendar files and a SQLite tracker

#![allow(clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use application::{
    DeadlineSyncService, ScanRequest,
    ports::{CalendarPort, ClockPort, FixedClock, ProcessedEmailStore},
};
use chrono::{NaiveDate, TimeZone, Utc};
use domain::{EmailId, EmailMessage, UserId};
use infrastructure::{
    DatabaseConfig, JsonCalendarAdapter, JsonMailboxAdapter, SqliteProcessedEmailStore,
    create_pool,
};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    clock: Arc<dyn ClockPort>,
    calendar: Arc<JsonCalendarAdapter>,
}

impl Fixture {
    fn new(messages: &[EmailMessage]) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("mailbox.json"),
            serde_json::to_string(messages).expect("serialize mailbox"),
        )
        .expect("write mailbox");

        let clock: Arc<dyn ClockPort> = Arc::new(FixedClock::at_date(
            NaiveDate::from_ymd_opt(2026, 1, 5).expect("valid date"),
        ));
        let calendar = Arc::new(JsonCalendarAdapter::new(
            dir.path().join("calendar.json"),
            Arc::clone(&clock),
        ));
        Self {
            dir,
            clock,
            calendar,
        }
    }

    fn store(&self) -> Arc<dyn ProcessedEmailStore> {
        self.store_named("tracker.db")
    }

    fn store_named(&self, file: &str) -> Arc<dyn ProcessedEmailStore> {
        Arc::new(self.sqlite_store(file))
    }

    fn sqlite_store(&self, file: &str) -> SqliteProcessedEmailStore {
        let config = DatabaseConfig {
            path: self
                .dir
                .path()
                .join(file)
                .to_string_lossy()
                .into_owned(),
            max_connections: 4,
            run_migrations: true,
            ..DatabaseConfig::default()
        };
        let pool = create_pool(&config).expect("pool");
        SqliteProcessedEmailStore::new(Arc::new(pool))
    }

    fn service(&self, store: Arc<dyn ProcessedEmailStore>) -> DeadlineSyncService {
        let mailbox = JsonMailboxAdapter::new(
            self.dir.path().join("mailbox.json"),
            Arc::clone(&self.clock),
        );
        DeadlineSyncService::new(
            Arc::new(mailbox),
            Arc::clone(&self.calendar) as Arc<dyn CalendarPort>,
            store,
            Arc::clone(&self.clock),
        )
    }
}

fn mailbox() -> Vec<EmailMessage> {
    let received = Utc
        .with_ymd_and_hms(2026, 1, 3, 9, 0, 0)
        .single()
        .expect("valid timestamp");
    vec![
        EmailMessage::new("m1", "Software Engineer Position - Apply by Jan 20, 2026")
            .with_sender("jobs@acme.example")
            .with_received_at(received),
        EmailMessage::new("m2", "Technical interview")
            .with_body("Please confirm your interview slot by January 12, 2026 at 10am.")
            .with_received_at(received),
        EmailMessage::new("m3", "Weekly digest")
            .with_body("No dates in here.")
            .with_received_at(received),
    ]
}

fn request() -> ScanRequest {
    ScanRequest::new(UserId::new("alice@example.com").expect("valid user"))
}

#[tokio::test]
async fn scan_writes_events_and_is_idempotent() {
    let fixture = Fixture::new(&mailbox());
    let service = fixture.service(fixture.store());

    let first = service.scan(&request()).await.expect("scan");
    assert_eq!(first.summary.emitted, 2);
    assert_eq!(first.summary.no_deadline, 1);
    assert!(first.summary.is_consistent());

    let events = fixture.calendar.events().await.expect("events");
    assert_eq!(events.len(), 2);
    assert!(
        events
            .iter()
            .any(|e| e.title == "📝 APPLICATION DEADLINE: Software Engineer Position - Apply by Jan 20, 2026")
    );

    let second = service.scan(&request()).await.expect("scan");
    assert_eq!(second.summary.emitted, 0);
    assert_eq!(second.summary.duplicate_id, 2);
    assert_eq!(fixture.calendar.events().await.expect("events").len(), 2);
}

#[tokio::test]
async fn restarted_service_remembers_processed_emails() {
    let fixture = Fixture::new(&mailbox());
    fixture
        .service(fixture.store())
        .scan(&request())
        .await
        .expect("scan");

    let restarted = fixture.service(fixture.store());
    let result = restarted.scan(&request()).await.expect("scan");
    assert_eq!(result.summary.emitted, 0);
    assert_eq!(fixture.calendar.events().await.expect("events").len(), 2);
}

#[tokio::test]
async fn fresh_tracker_still_skips_events_already_on_calendar() {
    let fixture = Fixture::new(&mailbox());
    fixture
        .service(fixture.store())
        .scan(&request())
        .await
        .expect("scan");

    let result = fixture
        .service(fixture.store_named("fresh.db"))
        .scan(&request())
        .await
        .expect("scan");
    assert_eq!(result.summary.emitted, 0);
    assert_eq!(result.summary.duplicate_title, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_services_sharing_a_tracker_create_each_event_once() {
    let fixture = Fixture::new(&mailbox());
    let store = fixture.store();
    let first = fixture.service(Arc::clone(&store));
    let second = fixture.service(store);

    let request = request();
    let (a, b) = tokio::join!(first.scan(&request), second.scan(&request));
    let (a, b) = (a.expect("scan"), b.expect("scan"));

    assert_eq!(a.summary.emitted + b.summary.emitted, 2);
    assert!(a.summary.is_consistent());
    assert!(b.summary.is_consistent());
    assert_eq!(fixture.calendar.events().await.expect("events").len(), 2);
}

#[tokio::test]
async fn claim_left_by_dead_scan_is_taken_over_after_lease() {
    let fixture = Fixture::new(&mailbox());
    let store: Arc<dyn ProcessedEmailStore> = Arc::new(
        fixture
            .sqlite_store("tracker.db")
            .with_pending_lease(Duration::from_millis(20)),
    );
    let user_id = UserId::new("alice@example.com").expect("valid user");
    let claimed = store
        .claim(&user_id, &EmailId::new("m1").expect("valid id"))
        .await
        .expect("claim");
    assert!(claimed.is_claimed());

    tokio::time::sleep(Duration::from_millis(50)).await;

    let result = fixture
        .service(store)
        .scan(&request())
        .await
        .expect("scan");
    assert_eq!(result.summary.emitted, 2);
    assert_eq!(result.summary.duplicate_id, 0);
    assert_eq!(fixture.calendar.events().await.expect("events").len(), 2);
}
