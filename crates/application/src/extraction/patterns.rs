//! Date grammar
//!
//! Each recognised date form is a [`DatePattern`] variant pairing a regular
//! expression with a parser for its captures. Variants are tried in
//! [`DatePattern::ALL`] order; when two forms match overlapping text the
//! earlier variant wins.

use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::{Captures, Regex};
use serde::Serialize;

/// Month names, full or abbreviated, matched case-insensitively
const MONTH: &str = r"(?P<month>jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b\.?";

/// Clock time; either `HH:MM` with optional meridiem or `H am/pm`
const TIME: &str = r"(?P<hour>\d{1,2})(?::(?P<minute>\d{2})\s*(?P<meridiem>[ap]\.?m\b\.?)?|\s*(?P<meridiem_only>[ap]\.?m\b\.?))(?:\s*(?:est|edt|cst|cdt|mst|mdt|pst|pdt|utc|gmt)\b)?";

fn compile(pattern: &str) -> Regex {
    #[allow(clippy::expect_used)] // Infallible with valid static patterns
    Regex::new(pattern).expect("Failed to compile date pattern")
}

static MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)\b{MONTH}\s*(?P<day>\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s*(?P<year>\d{{4}})\b)?"
    ))
});

static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)\b(?P<day>\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTH}(?:,?\s*(?P<year>\d{{4}})\b)?"
    ))
});

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(?P<year>\d{4})-(?P<month>\d{1,2})-(?P<day>\d{1,2})\b"));

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(?P<first>\d{1,2})[/-](?P<second>\d{1,2})[/-](?P<year>\d{4}|\d{2})\b")
});

/// Time directly following a date, e.g. `, at 11:59 PM`
static ADJACENT_TIME: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)^\s*,?\s*(?:(?:at|by|before|until|@)\s*)?{TIME}"
    ))
});

/// Time appearing on its own
static STANDALONE_TIME: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(?i)\b{TIME}")));

/// Recognised date forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePattern {
    /// `January 10, 2026`, `Jan. 10`, `Dec 15th`
    MonthDayYear,
    /// `01 Jan 2026`, `15th of December`
    DayMonthYear,
    /// `2026-01-10`
    IsoDate,
    /// `01/10/2026`, `1-10-26`
    NumericDate,
}

/// Lexical pieces of a date as written; not yet validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateParts {
    pub month: u32,
    pub day: u32,
    /// Absent when the text gave no year
    pub year: Option<i32>,
    /// Clock time written next to the date
    pub time: Option<NaiveTime>,
    pub pattern: DatePattern,
}

impl DatePattern {
    /// Patterns in precedence order
    pub const ALL: [Self; 4] = [
        Self::MonthDayYear,
        Self::DayMonthYear,
        Self::IsoDate,
        Self::NumericDate,
    ];

    /// Compiled expression for this form
    pub fn regex(self) -> &'static Regex {
        match self {
            Self::MonthDayYear => &MONTH_DAY_YEAR,
            Self::DayMonthYear => &DAY_MONTH_YEAR,
            Self::IsoDate => &ISO_DATE,
            Self::NumericDate => &NUMERIC_DATE,
        }
    }

    /// Turn a match of [`Self::regex`] into date parts
    ///
    /// `day_first` only affects [`Self::NumericDate`], which is read
    /// month-first by default.
    pub fn parse(self, caps: &Captures<'_>, day_first: bool) -> Option<DateParts> {
        let (month, day, year) = match self {
            Self::MonthDayYear | Self::DayMonthYear => (
                month_number(caps.name("month")?.as_str())?,
                number(caps, "day")?,
                caps.name("year").and_then(|y| y.as_str().parse().ok()),
            ),
            Self::IsoDate => (
                number(caps, "month")?,
                number(caps, "day")?,
                Some(caps.name("year")?.as_str().parse().ok()?),
            ),
            Self::NumericDate => {
                let first = number(caps, "first")?;
                let second = number(caps, "second")?;
                let (month, day) = if day_first {
                    (second, first)
                } else {
                    (first, second)
                };
                (month, day, Some(expand_year(caps.name("year")?.as_str())?))
            },
        };

        Some(DateParts {
            month,
            day,
            year,
            time: None,
            pattern: self,
        })
    }
}

/// Match a clock time at the very start of `rest`
///
/// Returns the time and the number of bytes it spans.
pub fn adjacent_time(rest: &str) -> Option<(NaiveTime, usize)> {
    let caps = ADJACENT_TIME.captures(rest)?;
    let time = parse_time(&caps)?;
    Some((time, caps.get(0)?.end()))
}

/// All free-standing clock times in `text` as `(time, start, end)`
pub fn standalone_times(text: &str) -> Vec<(NaiveTime, usize, usize)> {
    STANDALONE_TIME
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            parse_time(&caps).map(|t| (t, whole.start(), whole.end()))
        })
        .collect()
}

fn parse_time(caps: &Captures<'_>) -> Option<NaiveTime> {
    let hour = number(caps, "hour")?;
    let minute = caps
        .name("minute")
        .map_or(Some(0), |m| m.as_str().parse().ok())?;
    let meridiem = caps
        .name("meridiem")
        .or_else(|| caps.name("meridiem_only"))
        .map(|m| m.as_str().to_ascii_lowercase());

    let hour = match meridiem {
        Some(m) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (m.starts_with('p'), hour) {
                (true, 12) => 12,
                (true, h) => h + 12,
                (false, 12) => 0,
                (false, h) => h,
            }
        },
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn number(caps: &Captures<'_>, name: &str) -> Option<u32> {
    caps.name(name)?.as_str().parse().ok()
}

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?.to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
