//! Value Objects - Immutable, identity-less domain primitives

mod confidence;
mod date_source;
mod deadline_type;
mod email_id;
mod event_ref;
mod urgency;
mod user_id;

pub use confidence::Confidence;
pub use date_source::DateSource;
pub use deadline_type::DeadlineType;
pub use email_id::EmailId;
pub use event_ref::EventRef;
pub use urgency::Urgency;
pub use user_id::UserId;
