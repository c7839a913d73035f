//! Persistence module
//!
//! SQLite-based storage for the processed-email tracker.

pub mod connection;
pub mod error;
pub mod migrations;
pub mod processed_email_store;

pub use connection::{ConnectionPool, DatabaseError, create_pool};
pub use processed_email_store::SqliteProcessedEmailStore;
