//! Deadline entity - The single authoritative deadline of one email

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::value_objects::{Confidence, DateSource, DeadlineType, EmailId, Urgency};

/// Time used when an email gives a date without a clock time
pub const DEFAULT_DEADLINE_TIME: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 0) {
    Some(t) => t,
    None => NaiveTime::MIN,
};

/// A calendar-ready deadline extracted from an email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    /// Email the deadline was extracted from
    pub email_id: EmailId,
    /// Email subject, used as the base of the calendar title
    pub title: String,
    /// Sender of the email
    #[serde(default)]
    pub sender: String,
    /// Inferred kind of deadline
    pub deadline_type: DeadlineType,
    /// Due date
    pub date: NaiveDate,
    /// Due time, if the email stated one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    /// Whole days from the scan date until the deadline, never negative
    pub urgency_days: i64,
    /// Where the date was found
    pub source: DateSource,
    /// How much the resolver trusts the date
    pub confidence: Confidence,
    /// Text that produced the date
    pub raw_text: String,
}

impl Deadline {
    /// Days between `today` and `date`, clamped at zero
    pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
        (date - today).num_days().max(0)
    }

    /// Urgency bucket for `urgency_days`
    pub const fn urgency(&self) -> Urgency {
        Urgency::from_days(self.urgency_days)
    }

    /// Stated time, or 23:59 when none was given
    pub fn effective_time(&self) -> NaiveTime {
        self.time.unwrap_or(DEFAULT_DEADLINE_TIME)
    }

    /// Date and effective time combined
    pub fn due_at(&self) -> NaiveDateTime {
        self.date.and_time(self.effective_time())
    }

    /// Whether the deadline lies before `today`
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.date < today
    }

    /// Title of the calendar event, e.g. `📝 APPLICATION DEADLINE: <subject>`
    pub fn calendar_title(&self) -> String {
        format!("{}: {}", self.deadline_type.title_prefix(), self.title)
    }

    /// Multi-line event description
    pub fn calendar_description(&self) -> String {
        let sender = if self.sender.is_empty() {
            "Unknown sender"
        } else {
            self.sender.as_str()
        };
        format!(
            "Automated deadline reminder\n\nSubject: {}\nFrom: {}\nType: {}\nExtracted text: \"{}\"\n\nAction required: {}",
            self.title,
            sender,
            self.deadline_type,
            self.raw_text,
            self.deadline_type.action_text()
        )
    }
}
