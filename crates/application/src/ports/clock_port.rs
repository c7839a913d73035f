//! Clock port
//!
//! Supplies the scan's reference instant so date rules can be tested
//! against a fixed "now".

use std::fmt::Debug;

use chrono::{DateTime, NaiveDate, Utc};

/// Source of the current time
pub trait ClockPort: Send + Sync + Debug {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current date
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Freeze at the given instant
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self(now)
    }

    /// Freeze at noon UTC on the given date
    pub fn at_date(date: NaiveDate) -> Self {
        Self(date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc())
    }
}

impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
