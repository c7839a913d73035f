//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod calendar_port;
mod clock_port;
mod mail_port;
mod processed_email_store;

#[cfg(test)]
pub use calendar_port::MockCalendarPort;
pub use calendar_port::{CalendarError, CalendarPort};
pub use clock_port::{ClockPort, FixedClock, SystemClock};
#[cfg(test)]
pub use mail_port::MockMailPort;
pub use mail_port::{MailError, MailPort};
#[cfg(test)]
pub use processed_email_store::MockProcessedEmailStore;
pub use processed_email_store::{
    ClaimOutcome, DEFAULT_PENDING_LEASE, ProcessedEmailStore, lease_cutoff,
};
