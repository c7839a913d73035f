//! Domain layer for deadline-sync
//!
//! Contains the entities, value objects, and domain errors shared by the
//! extraction pipeline and the processed-email tracker.
//! This layer performs no I/O and defines the ubiquitous language.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
