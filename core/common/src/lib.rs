//! Common utilities and types shared across the cairn key subsystem.
//!
//! This module provides the error type and the identifiers used to address
//! objects in a repository store.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ObjectId, ObjectType, SensitiveBytes};
