//! Deadline extraction
//!
//! Three stages turn an email into at most one [`Deadline`]:
//!
//! 1. [`DateCandidateExtractor`] finds date-looking spans in subject and body
//! 2. [`DateResolver`] turns each span into a validated date
//! 3. [`DeadlineSelector`] picks the authoritative one and infers its type

mod candidate;
mod patterns;
mod policy;
mod resolver;
mod selector;

use chrono::NaiveDate;
use domain::{DateSource, Deadline, EmailId, EmailMessage};
use serde::Serialize;

pub use candidate::{CandidateKind, DateCandidate, DateCandidateExtractor};
pub use patterns::{DateParts, DatePattern};
pub use policy::DeadlinePolicy;
pub use resolver::{DateFlag, DateResolver, RejectionReason, ResolvedDate};
pub use selector::DeadlineSelector;

/// Everything the pipeline learned about one email
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub candidates: Vec<DateCandidate>,
    pub resolved: Vec<ResolvedDate>,
    pub deadline: Option<Deadline>,
}

/// Runs all three stages with one policy
#[derive(Debug, Clone, Default)]
pub struct DeadlineExtractor {
    candidates: DateCandidateExtractor,
    resolver: DateResolver,
    selector: DeadlineSelector,
}

impl DeadlineExtractor {
    pub fn new(policy: DeadlinePolicy) -> Self {
        Self {
            candidates: DateCandidateExtractor::new(policy.numeric_day_first),
            resolver: DateResolver::new(policy.clone()),
            selector: DeadlineSelector::new(policy),
        }
    }

    /// The deadline of `email` as seen on `today`
    pub fn extract_deadline(
        &self,
        email: &EmailMessage,
        email_id: &EmailId,
        today: NaiveDate,
    ) -> Option<Deadline> {
        self.analyze(email, email_id, today).deadline
    }

    /// Full breakdown of every stage, for diagnostics
    pub fn analyze(&self, email: &EmailMessage, email_id: &EmailId, today: NaiveDate) -> Extraction {
        let mut candidates = self.candidates.extract(&email.subject, DateSource::Subject);
        candidates.extend(self.candidates.extract(&email.body, DateSource::Body));

        let resolved: Vec<ResolvedDate> = candidates
            .iter()
            .filter_map(|c| self.resolver.resolve(c, today))
            .collect();
        let deadline = self
            .selector
            .build_deadline(email, email_id, &resolved, today);

        Extraction {
            candidates,
            resolved,
            deadline,
        }
    }
}
