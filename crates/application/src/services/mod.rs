//! Application services - Use case implementations

mod deadline_sync_service;
mod duplicate_guard;
mod processed_email_tracker;
mod scan_report;

pub use deadline_sync_service::{DeadlineSyncService, SyncSettings};
pub use duplicate_guard::{CalendarTitleSet, normalize_title};
pub use processed_email_tracker::ProcessedEmailTracker;
pub use scan_report::{
    CreateFailure, DEFAULT_DAYS_BACK, DEFAULT_MAX_EMAILS, ScanRequest, ScanResult, ScanSummary,
};
