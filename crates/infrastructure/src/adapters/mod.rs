//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod in_memory_processed_email_store;
mod json_calendar_adapter;
mod json_mailbox_adapter;

pub use in_memory_processed_email_store::InMemoryProcessedEmailStore;
pub use json_calendar_adapter::{CalendarEventRecord, JsonCalendarAdapter};
pub use json_mailbox_adapter::JsonMailboxAdapter;
