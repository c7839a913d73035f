//! Domain entities - Objects with identity and lifecycle

mod deadline;
mod email_message;
mod processed_email;

pub use deadline::{DEFAULT_DEADLINE_TIME, Deadline};
pub use email_message::EmailMessage;
pub use processed_email::{ProcessedEmailRecord, ProcessedOutcome, ProcessingState, TrackerError};
