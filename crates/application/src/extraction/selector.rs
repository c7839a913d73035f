//! Picks the one authoritative deadline of an email

use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use chrono::NaiveDate;
use domain::{DateSource, Deadline, DeadlineType, EmailId, EmailMessage};
use tracing::debug;

use super::{policy::DeadlinePolicy, resolver::ResolvedDate};

/// Keywords that identify a deadline type
///
/// `Application` is also the fallback when nothing matches.
static TYPE_KEYWORDS: LazyLock<Vec<(&'static str, DeadlineType)>> = LazyLock::new(|| {
    vec![
        ("apply", DeadlineType::Application),
        ("application", DeadlineType::Application),
        ("deadline", DeadlineType::Application),
        ("submit", DeadlineType::Application),
        ("due", DeadlineType::Application),
        ("interview", DeadlineType::Interview),
        ("meeting", DeadlineType::Interview),
        ("assess", DeadlineType::Assessment),
        ("test", DeadlineType::Assessment),
        ("challenge", DeadlineType::Assessment),
        ("exam", DeadlineType::Assessment),
        ("quiz", DeadlineType::Assessment),
        ("respond", DeadlineType::Response),
        ("response", DeadlineType::Response),
        ("reply", DeadlineType::Response),
        ("confirm", DeadlineType::Response),
        ("rsvp", DeadlineType::Response),
        ("event", DeadlineType::Event),
        ("conference", DeadlineType::Event),
        ("career fair", DeadlineType::Event),
        ("job fair", DeadlineType::Event),
        ("webinar", DeadlineType::Event),
        ("meetup", DeadlineType::Event),
    ]
});

static KEYWORD_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    let patterns: Vec<&str> = TYPE_KEYWORDS.iter().map(|(k, _)| *k).collect();
    #[allow(clippy::expect_used)] // Infallible with valid static patterns
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(&patterns)
        .expect("Failed to build keyword matcher")
});

/// Chooses the deadline from all resolved dates of one email
#[derive(Debug, Clone, Default)]
pub struct DeadlineSelector {
    policy: DeadlinePolicy,
}

impl DeadlineSelector {
    pub const fn new(policy: DeadlinePolicy) -> Self {
        Self { policy }
    }

    /// The earliest valid body date wins; only without one does the earliest
    /// valid subject date count
    ///
    /// Subject dates of replies and forwards are ignored when the policy
    /// says so.
    pub fn select<'a>(
        &self,
        email: &EmailMessage,
        resolved: &'a [ResolvedDate],
    ) -> Option<&'a ResolvedDate> {
        let earliest = |source: DateSource| {
            resolved
                .iter()
                .filter(|r| r.source == source && r.is_valid())
                .min_by_key(|r| r.offset)
        };

        if let Some(body) = earliest(DateSource::Body) {
            return Some(body);
        }
        if self.policy.ignore_subject_on_reply && email.is_reply_or_forward() {
            debug!(email_id = %email.id, "Ignoring subject dates of reply/forward");
            return None;
        }
        earliest(DateSource::Subject)
    }

    /// Select and build the deadline
    pub fn build_deadline(
        &self,
        email: &EmailMessage,
        email_id: &EmailId,
        resolved: &[ResolvedDate],
        today: NaiveDate,
    ) -> Option<Deadline> {
        let winner = self.select(email, resolved)?;
        let source_text = match winner.source {
            DateSource::Subject => email.subject.as_str(),
            DateSource::Body => email.body.as_str(),
        };
        let deadline_type = self.infer_type(source_text, winner.offset, winner.end, &email.subject);

        Some(Deadline {
            email_id: email_id.clone(),
            title: email.subject.trim().to_string(),
            sender: email.sender.clone(),
            deadline_type,
            date: winner.date,
            time: winner.time,
            urgency_days: Deadline::days_until(winner.date, today),
            source: winner.source,
            confidence: winner.confidence,
            raw_text: winner.raw_text.clone(),
        })
    }

    /// Deadline type from the keyword nearest to `start..end` within the
    /// context window, falling back to the subject, then to `Application`
    pub fn infer_type(&self, text: &str, start: usize, end: usize, subject: &str) -> DeadlineType {
        let lo = floor_char_boundary(text, start.saturating_sub(self.policy.type_context_chars));
        let hi = floor_char_boundary(text, end.saturating_add(self.policy.type_context_chars));

        nearest_keyword(&text[lo..hi], start - lo, end - lo)
            .or_else(|| nearest_keyword(subject, 0, 0))
            .unwrap_or_default()
    }
}

/// Keyword closest to `start..end` in `window`; ties go to the earlier
/// entry of [`DeadlineType::all`]
fn nearest_keyword(window: &str, start: usize, end: usize) -> Option<DeadlineType> {
    KEYWORD_MATCHER
        .find_overlapping_iter(window)
        .filter(|m| {
            window[..m.start()]
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_alphanumeric())
        })
        .map(|m| {
            let distance = if m.end() <= start {
                start - m.end()
            } else {
                m.start().saturating_sub(end)
            };
            let deadline_type = TYPE_KEYWORDS[m.pattern().as_usize()].1;
            (distance, type_rank(deadline_type), deadline_type)
        })
        .min_by_key(|(distance, rank, _)| (*distance, *rank))
        .map(|(_, _, deadline_type)| deadline_type)
}

fn type_rank(deadline_type: DeadlineType) -> usize {
    DeadlineType::all()
        .iter()
        .position(|t| *t == deadline_type)
        .unwrap_or(usize::MAX)
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
