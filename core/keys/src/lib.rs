//! Key hierarchy for cairn repositories.
//!
//! This module provides:
//! - Password-protected key records persisted in the repository store
//! - Creation, opening and password search of key records
//! - Master-key encryption of repository objects, one at a time or as a
//!   lazily decrypted sequence
//!
//! # Architecture
//! A password is stretched with scrypt into a *user* key pair, which only
//! exists while a record is being written or opened. The user key seals the
//! randomly generated *master* key pair into the record. The master key stays
//! inside the [`Key`] handle and protects every other object.

pub mod identity;
pub mod iter;
pub mod key;
pub mod record;

pub use iter::Decrypted;
pub use key::{CreateOptions, Key};
pub use record::KeyRecord;
