//! Key types with secure memory handling.
//!
//! All key types automatically zeroize their memory on drop to prevent
//! sensitive data from persisting in memory.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::kdf::SALT_SIZE;
use crate::rng;
use cairn_common::{Error, Result};

/// Length of the AES-256 encryption key in bytes.
pub const ENCRYPTION_KEY_SIZE: usize = 32;

/// Length of the HMAC-SHA-256 signing key in bytes.
pub const SIGNING_KEY_SIZE: usize = 32;

/// A pair of keys used by the authenticated cipher.
///
/// The same type backs both tiers of the key hierarchy: the user key derived
/// from a password, which only lives for a single create or open call, and
/// the randomly generated master key held by an open repository.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    encrypt: [u8; ENCRYPTION_KEY_SIZE],
    sign: [u8; SIGNING_KEY_SIZE],
}

/// Wire form of [`KeyMaterial`] inside a sealed key record.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct EncodedKeyMaterial {
    encrypt: String,
    sign: String,
}

impl KeyMaterial {
    /// Create key material from raw bytes.
    pub fn from_parts(
        encrypt: [u8; ENCRYPTION_KEY_SIZE],
        sign: [u8; SIGNING_KEY_SIZE],
    ) -> Self {
        Self { encrypt, sign }
    }

    /// Generate fresh key material from the OS random source.
    ///
    /// Both halves are drawn independently.
    ///
    /// # Errors
    /// - Returns [`Error::RandomSource`] if the OS random source fails
    pub fn generate() -> Result<Self> {
        let mut keys = Self {
            encrypt: [0u8; ENCRYPTION_KEY_SIZE],
            sign: [0u8; SIGNING_KEY_SIZE],
        };
        rng::fill(&mut keys.encrypt)?;
        rng::fill(&mut keys.sign)?;
        Ok(keys)
    }

    /// Get the encryption key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn encryption_key(&self) -> &[u8; ENCRYPTION_KEY_SIZE] {
        &self.encrypt
    }

    /// Get the signing key bytes.
    pub fn signing_key(&self) -> &[u8; SIGNING_KEY_SIZE] {
        &self.sign
    }

    /// Compare two key pairs in constant time.
    pub fn ct_eq(&self, other: &KeyMaterial) -> bool {
        let encrypt = self.encrypt[..].ct_eq(&other.encrypt[..]);
        let sign = self.sign[..].ct_eq(&other.sign[..]);
        (encrypt & sign).into()
    }

    /// Serialize to JSON for sealing inside a key record.
    ///
    /// The returned buffer is zeroized when dropped.
    pub fn to_json(&self) -> Result<Zeroizing<Vec<u8>>> {
        let encoded = EncodedKeyMaterial {
            encrypt: STANDARD.encode(self.encrypt),
            sign: STANDARD.encode(self.sign),
        };
        serde_json::to_vec(&encoded)
            .map(Zeroizing::new)
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from the JSON produced by [`KeyMaterial::to_json`].
    ///
    /// # Errors
    /// - Returns error if the JSON is malformed or a key has the wrong length
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let encoded: EncodedKeyMaterial =
            serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))?;

        let mut keys = Self {
            encrypt: [0u8; ENCRYPTION_KEY_SIZE],
            sign: [0u8; SIGNING_KEY_SIZE],
        };
        decode_into(&encoded.encrypt, &mut keys.encrypt)?;
        decode_into(&encoded.sign, &mut keys.sign)?;
        Ok(keys)
    }
}

fn decode_into(encoded: &str, out: &mut [u8]) -> Result<()> {
    let decoded = Zeroizing::new(
        STANDARD
            .decode(encoded)
            .map_err(|e| Error::Serialization(format!("Invalid key encoding: {}", e)))?,
    );
    if decoded.len() != out.len() {
        return Err(Error::Serialization(format!(
            "Invalid key length: expected {}, got {}",
            out.len(),
            decoded.len()
        )));
    }
    out.copy_from_slice(&decoded);
    Ok(())
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial([REDACTED])")
    }
}

/// Salt for key derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt(Vec<u8>);

impl Salt {
    /// Generate a random salt of [`SALT_SIZE`] bytes.
    pub fn generate() -> Result<Self> {
        let mut salt = vec![0u8; SALT_SIZE];
        rng::fill(&mut salt)?;
        Ok(Self(salt))
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
