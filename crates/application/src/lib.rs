//! Application layer - Use cases and orchestration
//!
//! Contains deadline extraction, the processed-email tracker and the scan
//! orchestrator, plus the port definitions infrastructure adapters implement.

pub mod error;
pub mod extraction;
pub mod ports;
pub mod services;

#[cfg(test)]
mod test_support;

pub use error::ApplicationError;
pub use extraction::{DeadlineExtractor, DeadlinePolicy, Extraction};
pub use ports::*;
pub use services::*;
