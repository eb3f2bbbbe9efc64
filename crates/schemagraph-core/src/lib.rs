//! schemagraph-core: Shared vocabulary for the schemagraph data-access layer.
//!
//! This crate holds everything that does not need a database connection:
//! - Property bags and their values, including the sanitization-exempt wrapper
//! - Relationship direction and relation targets (including the self sentinel)
//! - The input sanitization policy
//! - Layered configuration loading
//! - Error kinds shared by every operation

pub mod config;
pub mod error;
pub mod sanitize;
pub mod types;

pub use error::{CoreError, ErrorKind};
pub use types::{
    Direction, Properties, PropertyValue, RelationTarget, DEFAULT_DIRECTION, SELF_LABEL,
};
