//! Object store abstraction for cairn repositories.
//!
//! This module provides the [`Backend`] trait the key subsystem consumes and
//! two reference implementations.
//!
//! # Design Principles
//! - Content addressing: object ids are the SHA-256 digest of the stored bytes
//! - Coarse typing: every object belongs to one [`ObjectType`](cairn_common::ObjectType)
//! - Stable enumeration: `list` returns ids in sorted order
//! - Per-item errors: bulk iteration reports fetch failures per object

pub mod backend;
pub mod local;
pub mod memory;

pub use backend::{Backend, ObjectIter};
pub use local::LocalBackend;
pub use memory::MemoryBackend;
