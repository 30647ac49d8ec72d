//! Cryptographic primitives for the cairn key subsystem.
//!
//! This module provides:
//! - Key derivation using scrypt
//! - Key material (encryption key + signing key) with automatic zeroization
//! - Authenticated encryption: AES-256-CBC with HMAC-SHA-256 (encrypt-then-MAC)
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - MAC tags are verified in constant time before any decryption
//! - Padding is validated with a fixed-work scan

pub mod cipher;
pub mod kdf;
pub mod keys;
mod rng;

pub use cipher::{open, overhead, padded_len, seal, BLOCK_SIZE, IV_SIZE, MAC_SIZE, OVERHEAD};
pub use kdf::{derive, derive_key_material, KdfParams, KDF_SCRYPT, MAX_KDF_MEMORY, SALT_SIZE};
pub use keys::{KeyMaterial, Salt, ENCRYPTION_KEY_SIZE, SIGNING_KEY_SIZE};
