//! Common error types for cairn.

use thiserror::Error;

/// Top-level error type for key and repository operations.
///
/// Failures that depend on stored or attacker-controlled bytes are always
/// reported through this type, never as panics. A wrong password and a
/// tampered record both surface as [`Error::Unauthenticated`].
#[derive(Debug, Error)]
pub enum Error {
    /// MAC verification failed: wrong key, tampering, or corruption.
    #[error("Ciphertext verification failed")]
    Unauthenticated,

    /// No key record could be opened with the supplied password.
    #[error("No key could be found")]
    NoKeyFound,

    /// The key record names a KDF this implementation does not support.
    #[error("Unsupported KDF: {0}")]
    UnsupportedKdf(String),

    /// Padding bytes of an authenticated ciphertext are invalid.
    #[error("Malformed padding")]
    MalformedPadding,

    /// The operating system random source could not deliver bytes.
    #[error("Random source unavailable: {0}")]
    RandomSource(String),

    /// Password-based key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// Cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
