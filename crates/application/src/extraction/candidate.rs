//! Lexical scan for date-looking text

use chrono::NaiveTime;
use domain::DateSource;
use serde::Serialize;

use super::patterns::{self, DateParts, DatePattern};

/// What a candidate span contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateKind {
    /// A calendar date, possibly with an attached time
    Date(DateParts),
    /// A clock time with no date
    TimeOnly { time: NaiveTime },
}

/// An unvalidated date-like span of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateCandidate {
    /// Matched text, including any attached time
    pub raw_text: String,
    /// Part of the email the text came from
    pub source: DateSource,
    /// Byte offset of the match in its source text
    pub offset: usize,
    /// End of the match in its source text
    pub end: usize,
    pub kind: CandidateKind,
}

impl DateCandidate {
    /// Whether this candidate carries a date
    pub const fn is_date(&self) -> bool {
        matches!(self.kind, CandidateKind::Date(_))
    }
}

/// Finds every date and time span in a piece of text
#[derive(Debug, Clone, Copy, Default)]
pub struct DateCandidateExtractor {
    numeric_day_first: bool,
}

impl DateCandidateExtractor {
    /// Create an extractor; `numeric_day_first` reads `03/04/2026` as 3 April
    pub const fn new(numeric_day_first: bool) -> Self {
        Self { numeric_day_first }
    }

    /// Scan `text` and return candidates ordered by offset
    ///
    /// A text span is claimed by the first pattern that matches it; later
    /// patterns and free-standing times overlapping a claimed span are
    /// skipped. Repeated dates yield repeated candidates.
    pub fn extract(&self, text: &str, source: DateSource) -> Vec<DateCandidate> {
        let mut candidates: Vec<DateCandidate> = Vec::new();

        for pattern in DatePattern::ALL {
            for caps in pattern.regex().captures_iter(text) {
                let Some(whole) = caps.get(0) else { continue };
                if overlaps_any(&candidates, whole.start(), whole.end()) {
                    continue;
                }
                let Some(mut parts) = pattern.parse(&caps, self.numeric_day_first) else {
                    continue;
                };

                let mut end = whole.end();
                if let Some((time, len)) = patterns::adjacent_time(&text[end..]) {
                    parts.time = Some(time);
                    end += len;
                }

                candidates.push(DateCandidate {
                    raw_text: text[whole.start()..end].trim().to_string(),
                    source,
                    offset: whole.start(),
                    end,
                    kind: CandidateKind::Date(parts),
                });
            }
        }

        for (time, start, end) in patterns::standalone_times(text) {
            if overlaps_any(&candidates, start, end) {
                continue;
            }
            candidates.push(DateCandidate {
                raw_text: text[start..end].to_string(),
                source,
                offset: start,
                end,
                kind: CandidateKind::TimeOnly { time },
            });
        }

        candidates.sort_by_key(|c| c.offset);
        candidates
    }
}

fn overlaps_any(existing: &[DateCandidate], start: usize, end: usize) -> bool {
    existing.iter().any(|c| start < c.end && c.offset < end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<DateCandidate> {
        DateCandidateExtractor::default().extract(text, DateSource::Body)
    }

    fn date_parts(c: &DateCandidate) -> DateParts {
        match c.kind {
            CandidateKind::Date(parts) => parts,
            CandidateKind::TimeOnly { .. } => unreachable!("expected a date candidate"),
        }
    }

    #[test]
    fn finds_dates_in_offset_order() {
        let found = extract("Interview on 2026-02-03, apply by January 10, 2026.");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].raw_text, "2026-02-03");
        assert_eq!(found[1].raw_text, "January 10, 2026");
        assert!(found[0].offset < found[1].offset);
    }

    #[test]
    fn attaches_adjacent_time() {
        let found = extract("Submit by January 10, 2026 at 11:59 PM EST.");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw_text, "January 10, 2026 at 11:59 PM EST");
        assert_eq!(
            date_parts(&found[0]).time,
            NaiveTime::from_hms_opt(23, 59, 0)
        );
    }

    #[test]
    fn time_without_date_is_tagged() {
        let found = extract("Join the call at 10:00 tomorrow");
        assert_eq!(found.len(), 1);
        assert!(!found[0].is_date());
        assert!(matches!(found[0].kind, CandidateKind::TimeOnly { .. }));
    }

    #[test]
    fn repeated_dates_are_kept() {
        let found = extract("Due Jan 5, 2026. Reminder: due Jan 5, 2026.");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].raw_text, found[1].raw_text);
    }

    #[test]
    fn overlapping_forms_yield_one_candidate() {
        let found = extract("Deadline: 15 January 2026");
        assert_eq!(found.len(), 1);
        assert_eq!(date_parts(&found[0]).pattern, DatePattern::DayMonthYear);
    }

    #[test]
    fn abbreviated_forms_agree() {
        for text in ["Jan 01, 2026", "Jan. 01, 2026", "01 Jan 2026"] {
            let found = extract(text);
            assert_eq!(found.len(), 1, "{text}");
            let parts = date_parts(&found[0]);
            assert_eq!((parts.month, parts.day, parts.year), (1, 1, Some(2026)));
        }
    }

    #[test]
    fn source_tag_is_carried() {
        let found =
            DateCandidateExtractor::default().extract("Apply by Jan 20, 2026", DateSource::Subject);
        assert_eq!(found[0].source, DateSource::Subject);
    }

    #[test]
    fn text_without_dates_yields_nothing() {
        assert!(extract("Thanks for applying! We'll be in touch.").is_empty());
    }
}
