//! # hedgedoc-core
//!
//! Core types, traits, and abstractions for the hedgedoc backend.
//!
//! This crate provides the records, DTOs, error type and repository traits
//! that the database layer and the HTTP API depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
