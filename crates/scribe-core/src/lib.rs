//! # Scribe Core
//!
//! The domain layer of Scribe.
//! This crate contains the guarded record lifecycle (validation and ownership
//! checks), the post entity built on it, and the ports infrastructure must implement.
//! It has zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod model;
pub mod ports;
pub mod service;

pub use error::{DomainError, RepoError};
pub use model::{Attributes, Model, Record, RecordState};
