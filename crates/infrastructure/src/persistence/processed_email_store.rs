//! SQLite-based processed-email persistence
//!
//! The claim is one conditional upsert, so it is atomic across pooled
//! connections and across processes sharing the database file. A pending
//! row older than the lease is claimable again by the same upsert.

use std::{sync::Arc, time::Duration};

use application::{
    error::ApplicationError,
    ports::{ClaimOutcome, DEFAULT_PENDING_LEASE, ProcessedEmailStore, lease_cutoff},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use domain::{
    EmailId, EventRef, ProcessedEmailRecord, ProcessedOutcome, ProcessingState, TrackerError,
    UserId,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tokio::task;
use tracing::{debug, instrument};

use super::{
    connection::ConnectionPool,
    error::{map_pool_error, map_sqlite_error},
};

/// Raw column values of one `processed_emails` row
type RawRecord = (String, String, String, Option<String>, Option<String>, String);

/// SQLite-based processed-email store
#[derive(Debug, Clone)]
pub struct SqliteProcessedEmailStore {
    pool: Arc<ConnectionPool>,
    pending_lease: Duration,
}

impl SqliteProcessedEmailStore {
    /// Create a new SQLite processed-email store
    #[must_use]
    pub const fn new(pool: Arc<ConnectionPool>) -> Self {
        Self {
            pool,
            pending_lease: DEFAULT_PENDING_LEASE,
        }
    }

    /// Let pending claims older than `lease` be claimed again
    #[must_use]
    pub const fn with_pending_lease(mut self, lease: Duration) -> Self {
        self.pending_lease = lease;
        self
    }
}

#[async_trait]
impl ProcessedEmailStore for SqliteProcessedEmailStore {
    #[instrument(skip(self), fields(user_id = %user_id, email_id = %email_id))]
    async fn get(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<Option<ProcessedEmailRecord>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let user = user_id.to_string();
        let email = email_id.to_string();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(map_pool_error)?;

            let raw = conn
                .query_row(
                    "SELECT user_id, email_id, state, event_ref, deadline_date, updated_at
                     FROM processed_emails WHERE user_id = ?1 AND email_id = ?2",
                    params![user, email],
                    row_to_raw,
                )
                .optional()
                .map_err(map_sqlite_error)?;

            raw.map(raw_to_record).transpose()
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self), fields(user_id = %user_id, email_id = %email_id))]
    async fn claim(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<ClaimOutcome, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let user = user_id.to_string();
        let email = email_id.to_string();
        let now = Utc::now();
        let stale_before = timestamp(lease_cutoff(now, self.pending_lease));

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(map_pool_error)?;

            let affected = conn
                .execute(
                    "INSERT INTO processed_emails (user_id, email_id, state, updated_at)
                     VALUES (?1, ?2, 'pending', ?3)
                     ON CONFLICT(user_id, email_id) DO UPDATE SET
                        state = 'pending',
                        event_ref = NULL,
                        deadline_date = NULL,
                        updated_at = excluded.updated_at
                     WHERE processed_emails.state = 'unseen'
                        OR (processed_emails.state = 'pending'
                            AND processed_emails.updated_at < ?4)",
                    params![user, email, timestamp(now), stale_before],
                )
                .map_err(map_sqlite_error)?;

            if affected == 1 {
                debug!("Claimed email");
                return Ok(ClaimOutcome::Claimed);
            }

            let outcome = match current_state(&conn, &user, &email)? {
                Some(ProcessingState::Created) => ClaimOutcome::AlreadyCreated,
                // A rollback may land between the upsert and this lookup.
                _ => ClaimOutcome::InFlight,
            };
            debug!(?outcome, "Email already claimed");
            Ok(outcome)
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self, outcome), fields(user_id = %user_id, email_id = %email_id))]
    async fn commit(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
        outcome: &ProcessedOutcome,
    ) -> Result<(), ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let user = user_id.to_string();
        let email = email_id.to_string();
        let event_ref = outcome.event_ref.to_string();
        let deadline_date = outcome.deadline_date.to_string();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(map_pool_error)?;

            let affected = conn
                .execute(
                    "UPDATE processed_emails SET
                        state = 'created', event_ref = ?1, deadline_date = ?2, updated_at = ?3
                     WHERE user_id = ?4 AND email_id = ?5 AND state = 'pending'",
                    params![event_ref, deadline_date, now_timestamp(), user, email],
                )
                .map_err(map_sqlite_error)?;

            if affected == 0 {
                let from = current_state(&conn, &user, &email)?.unwrap_or_default();
                return Err(TrackerError::InvalidTransition {
                    from,
                    to: ProcessingState::Created,
                }
                .into());
            }

            debug!("Committed email");
            Ok(())
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self), fields(user_id = %user_id, email_id = %email_id))]
    async fn rollback(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<(), ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let user = user_id.to_string();
        let email = email_id.to_string();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(map_pool_error)?;

            let affected = conn
                .execute(
                    "UPDATE processed_emails SET state = 'unseen', updated_at = ?1
                     WHERE user_id = ?2 AND email_id = ?3 AND state = 'pending'",
                    params![now_timestamp(), user, email],
                )
                .map_err(map_sqlite_error)?;

            if affected == 0 {
                let from = current_state(&conn, &user, &email)?.unwrap_or_default();
                return Err(TrackerError::InvalidTransition {
                    from,
                    to: ProcessingState::Unseen,
                }
                .into());
            }

            debug!("Rolled back email");
            Ok(())
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ProcessedEmailRecord>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let user = user_id.to_string();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(map_pool_error)?;

            let mut stmt = conn
                .prepare(
                    "SELECT user_id, email_id, state, event_ref, deadline_date, updated_at
                     FROM processed_emails WHERE user_id = ?1
                     ORDER BY updated_at DESC, email_id",
                )
                .map_err(map_sqlite_error)?;

            let rows = stmt
                .query_map([&user], row_to_raw)
                .map_err(map_sqlite_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_sqlite_error)?;

            rows.into_iter().map(raw_to_record).collect()
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn clear_user(&self, user_id: &UserId) -> Result<usize, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let user = user_id.to_string();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(map_pool_error)?;

            let removed = conn
                .execute("DELETE FROM processed_emails WHERE user_id = ?1", [&user])
                .map_err(map_sqlite_error)?;

            debug!(removed, "Cleared processed emails");
            Ok(removed)
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }
}

/// Fixed-width UTC timestamp so stored values sort chronologically
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn now_timestamp() -> String {
    timestamp(Utc::now())
}

fn current_state(
    conn: &Connection,
    user: &str,
    email: &str,
) -> Result<Option<ProcessingState>, ApplicationError> {
    let label: Option<String> = conn
        .query_row(
            "SELECT state FROM processed_emails WHERE user_id = ?1 AND email_id = ?2",
            params![user, email],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_sqlite_error)?;

    Ok(label.map(|l| l.parse::<ProcessingState>()).transpose()?)
}

fn row_to_raw(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn raw_to_record(raw: RawRecord) -> Result<ProcessedEmailRecord, ApplicationError> {
    let (user_id, email_id, state, event_ref, deadline_date, updated_at) = raw;

    let state: ProcessingState = state.parse()?;
    let outcome = match (event_ref, deadline_date) {
        (Some(event_ref), Some(date)) => Some(ProcessedOutcome {
            event_ref: EventRef::new(event_ref),
            deadline_date: date
                .parse::<NaiveDate>()
                .map_err(|e| ApplicationError::Internal(format!("Invalid stored date: {e}")))?,
        }),
        _ => None,
    };
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| ApplicationError::Internal(format!("Invalid stored timestamp: {e}")))?
        .with_timezone(&Utc);

    Ok(ProcessedEmailRecord {
        user_id: UserId::new(user_id)?,
        email_id: EmailId::new(email_id)?,
        state,
        outcome,
        updated_at,
    })
}
