//! Infrastructure layer - Adapters for external systems
//!
//! Implements ports defined in the application layer.
//! Contains the SQLite tracker store, JSON mailbox and calendar adapters,
//! configuration loading and tracing setup.

pub mod adapters;
pub mod config;
pub mod persistence;
pub mod telemetry;

pub use adapters::*;
pub use config::{AppConfig, DatabaseConfig, LoggingConfig, ScanAppConfig};
pub use persistence::{ConnectionPool, DatabaseError, SqliteProcessedEmailStore, create_pool};
pub use telemetry::{TelemetryError, init_tracing};
