//! JSON calendar adapter - Implements CalendarPort over a local JSON file
//!
//! Events are stored as a JSON array. Writes go to a temporary file that is
//! then renamed over the calendar, and are serialized by an in-process lock.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use application::ports::{CalendarError, CalendarPort, ClockPort};
use async_trait::async_trait;
use chrono::{Days, NaiveDateTime};
use domain::{Deadline, DeadlineType, EventRef};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// One event in the calendar file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventRecord {
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    #[serde(default)]
    pub description: String,
    /// Reminder lead times in minutes
    #[serde(default)]
    pub reminders: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_type: Option<DeadlineType>,
    /// Email the event was created from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,
}

impl CalendarEventRecord {
    /// Event for an extracted deadline
    pub fn from_deadline(deadline: &Deadline) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: deadline.calendar_title(),
            start: deadline.due_at(),
            description: deadline.calendar_description(),
            reminders: deadline.deadline_type.reminder_minutes(),
            deadline_type: Some(deadline.deadline_type),
            email_id: Some(deadline.email_id.to_string()),
        }
    }
}

/// Calendar backed by a JSON file
pub struct JsonCalendarAdapter {
    path: PathBuf,
    clock: Arc<dyn ClockPort>,
    write_lock: Mutex<()>,
}

impl fmt::Debug for JsonCalendarAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCalendarAdapter")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl JsonCalendarAdapter {
    /// Create an adapter for `path`; a missing file is an empty calendar
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            path: path.into(),
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All events in the file
    pub async fn events(&self) -> Result<Vec<CalendarEventRecord>, CalendarError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| CalendarError::OperationFailed(format!("Invalid calendar file: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(CalendarError::OperationFailed(e.to_string())),
        }
    }

    async fn save(&self, events: &[CalendarEventRecord]) -> Result<(), CalendarError> {
        let json = serde_json::to_string_pretty(events)
            .map_err(|e| CalendarError::OperationFailed(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| CalendarError::OperationFailed(e.to_string()))?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| CalendarError::OperationFailed(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CalendarError::OperationFailed(e.to_string()))
    }
}

#[async_trait]
impl CalendarPort for JsonCalendarAdapter {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn list_existing_titles(
        &self,
        lookahead_days: u32,
    ) -> Result<Vec<String>, CalendarError> {
        let today = self.clock.today();
        let until = today
            .checked_add_days(Days::new(u64::from(lookahead_days)))
            .unwrap_or(today);

        let titles: Vec<String> = self
            .events()
            .await?
            .into_iter()
            .filter(|e| (today..=until).contains(&e.start.date()))
            .map(|e| e.title)
            .collect();

        debug!(count = titles.len(), lookahead_days, "Listed calendar titles");
        Ok(titles)
    }

    #[instrument(skip(self, deadline), fields(email_id = %deadline.email_id))]
    async fn create_event(&self, deadline: &Deadline) -> Result<EventRef, CalendarError> {
        if deadline.title.trim().is_empty() {
            return Err(CalendarError::InvalidEvent("empty title".to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let mut events = self.events().await?;
        let event = CalendarEventRecord::from_deadline(deadline);
        let event_ref = EventRef::new(event.id.clone());

        info!(title = %event.title, start = %event.start, "Creating calendar event");
        events.push(event);
        self.save(&events).await?;

        Ok(event_ref)
    }
}
