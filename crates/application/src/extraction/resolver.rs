//! Turns raw candidates into validated absolute dates

use chrono::{Datelike, NaiveDate, NaiveTime};
use domain::{Confidence, DateSource};
use serde::Serialize;
use tracing::debug;

use super::{
    candidate::{CandidateKind, DateCandidate},
    policy::DeadlinePolicy,
};

/// Why a resolved date must not be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Subject dates must not lie in the past
    PastSubjectDate,
    /// Body date with an explicit year, older than the grace window
    StaleBodyDate,
}

/// Accepted but doubtful dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFlag {
    /// Body date inside the recent-past grace window
    GraceWindow,
    /// Yearless subject date unusually far in the future
    SuspiciousFarFuture,
}

/// A candidate resolved to a concrete date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub confidence: Confidence,
    /// The text gave no year and one was assumed
    pub year_inferred: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<DateFlag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_reason: Option<RejectionReason>,
    pub source: DateSource,
    pub offset: usize,
    pub end: usize,
    pub raw_text: String,
}

impl ResolvedDate {
    /// Usable as a deadline
    pub const fn is_valid(&self) -> bool {
        self.rejected_reason.is_none()
    }
}

/// Applies year inference and source-specific validation
#[derive(Debug, Clone, Default)]
pub struct DateResolver {
    policy: DeadlinePolicy,
}

impl DateResolver {
    pub const fn new(policy: DeadlinePolicy) -> Self {
        Self { policy }
    }

    /// Resolve one candidate against the scan date `today`
    ///
    /// Returns `None` for time-only candidates and for dates that do not
    /// exist on the calendar (Feb 30, or Feb 29 rolled into a common year).
    pub fn resolve(&self, candidate: &DateCandidate, today: NaiveDate) -> Option<ResolvedDate> {
        let CandidateKind::Date(parts) = candidate.kind else {
            debug!(raw = %candidate.raw_text, "Ignoring time-only candidate");
            return None;
        };

        let (date, year_inferred) = match parts.year {
            Some(year) => (NaiveDate::from_ymd_opt(year, parts.month, parts.day), false),
            None => (self.infer_year(parts.month, parts.day, today), true),
        };
        let Some(date) = date else {
            debug!(raw = %candidate.raw_text, "Unparsable date candidate");
            return None;
        };

        let days_ahead = (date - today).num_days();
        let mut flag = None;
        let mut rejected_reason = None;

        match candidate.source {
            DateSource::Subject => {
                if days_ahead < 0 {
                    rejected_reason = Some(RejectionReason::PastSubjectDate);
                } else if year_inferred && days_ahead > self.policy.subject_far_future_days {
                    flag = Some(DateFlag::SuspiciousFarFuture);
                }
            },
            DateSource::Body => {
                if days_ahead < 0 {
                    if -days_ahead <= self.policy.body_grace_days {
                        flag = Some(DateFlag::GraceWindow);
                    } else {
                        rejected_reason = Some(RejectionReason::StaleBodyDate);
                    }
                }
            },
        }

        let confidence = if flag.is_some() {
            Confidence::Low
        } else if year_inferred {
            Confidence::Medium
        } else {
            Confidence::High
        };

        debug!(
            raw = %candidate.raw_text,
            source = %candidate.source,
            date = %date,
            ?flag,
            ?rejected_reason,
            "Resolved date candidate"
        );

        Some(ResolvedDate {
            date,
            time: parts.time,
            confidence,
            year_inferred,
            flag,
            rejected_reason,
            source: candidate.source,
            offset: candidate.offset,
            end: candidate.end,
            raw_text: candidate.raw_text.clone(),
        })
    }

    /// Place a yearless date in the current year, or the next one if it has
    /// already passed by more than the rollover threshold or does not exist
    /// this year
    fn infer_year(&self, month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
        let next_year = || NaiveDate::from_ymd_opt(today.year() + 1, month, day);
        match NaiveDate::from_ymd_opt(today.year(), month, day) {
            Some(this_year)
                if (today - this_year).num_days() > self.policy.year_rollover_after_days =>
            {
                next_year()
            },
            Some(this_year) => Some(this_year),
            // Feb 29 outside a leap year
            None => next_year(),
        }
    }
}
