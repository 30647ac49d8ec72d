//! Key derivation using scrypt.
//!
//! scrypt is a memory-hard password hashing function. Its cost parameters are
//! stored next to the salt in every key record, so they can be raised for new
//! records without breaking old ones.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::keys::{KeyMaterial, ENCRYPTION_KEY_SIZE, SIGNING_KEY_SIZE};
use cairn_common::{Error, Result};

/// Identifier of the scrypt KDF in key records.
pub const KDF_SCRYPT: &str = "scrypt";

/// Length of a freshly generated salt in bytes.
pub const SALT_SIZE: usize = 64;

/// Ceiling on scrypt working memory, `128 * r * N` and `128 * r * p`.
///
/// Parameters come from stored records, so anything above this is rejected
/// before derivation instead of being handed to the allocator.
pub const MAX_KDF_MEMORY: u64 = 1 << 30;

/// Parameters for scrypt key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// CPU/memory cost, a power of two greater than 1.
    #[serde(rename = "N")]
    pub n: u64,
    /// Block size.
    pub r: u32,
    /// Parallelization.
    pub p: u32,
}

impl KdfParams {
    /// Create validated parameters.
    ///
    /// # Errors
    /// - Returns error if `n` is not a power of two greater than 1
    /// - Returns error if `r` or `p` is zero
    /// - Returns error if the cost exceeds [`MAX_KDF_MEMORY`]
    pub fn new(n: u64, r: u32, p: u32) -> Result<Self> {
        let params = Self { n, r, p };
        params.validate()?;
        Ok(params)
    }

    /// Create parameters suitable for interactive use (N = 2^16, 64 MiB).
    pub fn interactive() -> Self {
        Self {
            n: 1 << 16,
            r: 8,
            p: 1,
        }
    }

    /// Create parameters for sensitive data (N = 2^18, 256 MiB).
    pub fn sensitive() -> Self {
        Self {
            n: 1 << 18,
            r: 8,
            p: 1,
        }
    }

    /// Create moderate parameters for constrained devices (N = 2^14, 16 MiB).
    pub fn moderate() -> Self {
        Self {
            n: 1 << 14,
            r: 8,
            p: 1,
        }
    }

    /// Check that the parameters describe a valid scrypt configuration.
    pub fn validate(&self) -> Result<()> {
        self.log_n().map(|_| ())
    }

    fn log_n(&self) -> Result<u8> {
        if self.n < 2 || !self.n.is_power_of_two() {
            return Err(Error::InvalidInput(format!(
                "scrypt N must be a power of two greater than 1, got {}",
                self.n
            )));
        }
        if self.r == 0 || self.p == 0 {
            return Err(Error::InvalidInput(
                "scrypt r and p must be at least 1".to_string(),
            ));
        }

        let log_n = self.n.trailing_zeros();
        if u64::from(log_n) >= 16 * u64::from(self.r) {
            return Err(Error::InvalidInput(format!(
                "scrypt N = 2^{} too large for r = {}",
                log_n, self.r
            )));
        }

        let block = 128 * u64::from(self.r);
        let within = |count: u64| {
            block
                .checked_mul(count)
                .is_some_and(|bytes| bytes <= MAX_KDF_MEMORY)
        };
        if !within(self.n) || !within(u64::from(self.p)) {
            return Err(Error::InvalidInput(format!(
                "scrypt cost N = {}, r = {}, p = {} exceeds the {} byte limit",
                self.n, self.r, self.p, MAX_KDF_MEMORY
            )));
        }

        Ok(log_n as u8)
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Derive `output_len` bytes from a password and salt using scrypt.
///
/// # Preconditions
/// - `salt` must not be empty
///
/// # Postconditions
/// - The output is deterministic given the same inputs
///
/// # Errors
/// - [`Error::InvalidInput`] for an empty salt or invalid parameters
/// - [`Error::KeyDerivation`] if scrypt itself fails
pub fn derive(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if salt.is_empty() {
        return Err(Error::InvalidInput(
            "scrypt called with empty salt".to_string(),
        ));
    }

    let scrypt_params = scrypt::Params::new(params.log_n()?, params.r, params.p, output_len)
        .map_err(|e| Error::InvalidInput(format!("Invalid KDF parameters: {}", e)))?;

    let mut output = Zeroizing::new(vec![0u8; output_len]);
    scrypt::scrypt(password, salt, &scrypt_params, &mut output)
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;

    Ok(output)
}

/// Derive a user key pair from a password and salt.
///
/// The first [`ENCRYPTION_KEY_SIZE`] bytes of the scrypt output become the
/// encryption key, the remaining [`SIGNING_KEY_SIZE`] bytes the signing key.
pub fn derive_key_material(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<KeyMaterial> {
    let output_len = ENCRYPTION_KEY_SIZE + SIGNING_KEY_SIZE;
    let output = derive(password, salt, params, output_len)?;

    if output.len() != output_len {
        return Err(Error::KeyDerivation(format!(
            "invalid number of bytes expanded from scrypt: {}",
            output.len()
        )));
    }

    let mut encrypt = [0u8; ENCRYPTION_KEY_SIZE];
    let mut sign = [0u8; SIGNING_KEY_SIZE];
    encrypt.copy_from_slice(&output[..ENCRYPTION_KEY_SIZE]);
    sign.copy_from_slice(&output[ENCRYPTION_KEY_SIZE..]);

    Ok(KeyMaterial::from_parts(encrypt, sign))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Use fast params for testing
    fn fast() -> KdfParams {
        KdfParams::new(1 << 10, 8, 1).unwrap()
    }

    #[test]
    fn test_derive_deterministic() {
        let salt = [42u8; SALT_SIZE];

        let key1 = derive_key_material(b"test-password-123", &salt, &fast()).unwrap();
        let key2 = derive_key_material(b"test-password-123", &salt, &fast()).unwrap();

        assert!(key1.ct_eq(&key2));
    }

    #[test]
    fn test_derive_different_salt() {
        let key1 = derive_key_material(b"password", &[1u8; SALT_SIZE], &fast()).unwrap();
        let key2 = derive_key_material(b"password", &[2u8; SALT_SIZE], &fast()).unwrap();

        assert!(!key1.ct_eq(&key2));
    }

    #[test]
    fn test_derive_different_password() {
        let salt = [42u8; SALT_SIZE];

        let key1 = derive_key_material(b"password1", &salt, &fast()).unwrap();
        let key2 = derive_key_material(b"password2", &salt, &fast()).unwrap();

        assert!(!key1.ct_eq(&key2));
    }

    #[test]
    fn test_output_split() {
        let salt = [5u8; 16];
        let raw = derive(b"pw", &salt, &fast(), 64).unwrap();
        let keys = derive_key_material(b"pw", &salt, &fast()).unwrap();

        assert_eq!(&raw[..32], keys.encryption_key());
        assert_eq!(&raw[32..], keys.signing_key());
    }

    #[test]
    fn test_params_affect_output() {
        let salt = [7u8; 16];
        let other = KdfParams::new(1 << 11, 8, 1).unwrap();

        let k1 = derive(b"pw", &salt, &fast(), 64).unwrap();
        let k2 = derive(b"pw", &salt, &other, 64).unwrap();

        assert_ne!(*k1, *k2);
    }

    #[test]
    fn test_empty_salt_fails() {
        assert!(matches!(
            derive(b"pw", b"", &fast(), 64),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_params() {
        assert!(KdfParams::new(0, 8, 1).is_err());
        assert!(KdfParams::new(1, 8, 1).is_err());
        assert!(KdfParams::new(1000, 8, 1).is_err());
        assert!(KdfParams::new(1 << 10, 0, 1).is_err());
        assert!(KdfParams::new(1 << 10, 8, 0).is_err());

        let bogus = KdfParams { n: 3, r: 8, p: 1 };
        assert!(derive(b"pw", b"salt", &bogus, 64).is_err());
    }

    #[test]
    fn test_oversized_cost_rejected() {
        let huge_n = KdfParams { n: 1 << 50, r: 8, p: 1 };
        assert!(matches!(huge_n.validate(), Err(Error::InvalidInput(_))));
        assert!(matches!(
            derive(b"pw", b"salt", &huge_n, 64),
            Err(Error::InvalidInput(_))
        ));

        let huge_r = KdfParams { n: 1 << 10, r: u32::MAX, p: 1 };
        assert!(huge_r.validate().is_err());

        let huge_p = KdfParams { n: 1 << 10, r: 8, p: u32::MAX };
        assert!(huge_p.validate().is_err());

        // N must stay below 2^(16 r)
        assert!(KdfParams::new(1 << 16, 1, 1).is_err());
        assert!(KdfParams::new(1 << 15, 1, 1).is_ok());

        // exactly at the limit: 128 * 8 * 2^20 = 1 GiB
        assert!(KdfParams::new(1 << 20, 8, 1).is_ok());
        assert!(KdfParams::new(1 << 21, 8, 1).is_err());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(KdfParams::interactive().validate().is_ok());
        assert!(KdfParams::sensitive().validate().is_ok());
        assert!(KdfParams::moderate().validate().is_ok());
        assert_eq!(KdfParams::default(), KdfParams::interactive());
    }

    #[test]
    fn test_params_serialize_field_names() {
        let json = serde_json::to_value(fast()).unwrap();
        assert_eq!(json["N"], 1024);
        assert_eq!(json["r"], 8);
        assert_eq!(json["p"], 1);
    }
}
