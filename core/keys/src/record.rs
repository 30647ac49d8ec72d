//! Persisted, password-protected key records.
//!
//! A record is stored as JSON under [`ObjectType::Key`](cairn_common::ObjectType::Key):
//!
//! ```json
//! {
//!   "created": "2024-01-01T12:00:00Z",
//!   "username": "alice",
//!   "hostname": "laptop",
//!   "comment": "optional",
//!   "kdf": "scrypt",
//!   "N": 65536, "r": 8, "p": 1,
//!   "salt": "<base64>",
//!   "data": "<base64 sealed master key>"
//! }
//! ```
//!
//! `data` can only be opened with the salt and cost parameters stored in the
//! same record. Records are never modified after they have been written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cairn_common::{Error, Result, SensitiveBytes};
use cairn_crypto::{derive_key_material, open, seal, KdfParams, KeyMaterial, Salt, KDF_SCRYPT};

/// A repository key record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// User that created the record, empty if unknown.
    #[serde(default)]
    pub username: String,
    /// Host the record was created on, empty if unknown.
    #[serde(default)]
    pub hostname: String,
    /// Free-text comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// KDF identifier.
    pub kdf: String,
    /// KDF cost parameters.
    #[serde(flatten)]
    pub params: KdfParams,
    /// KDF salt.
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    /// Master key sealed under the password-derived user key.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl KeyRecord {
    /// Build a record that seals `master` under a key derived from `password`.
    ///
    /// # Postconditions
    /// - A fresh random salt is generated
    /// - The user key is dropped (and zeroized) before returning
    ///
    /// # Errors
    /// - Invalid KDF parameters
    /// - Random source failure
    pub fn seal(
        password: &[u8],
        master: &KeyMaterial,
        params: KdfParams,
        username: String,
        hostname: String,
        comment: Option<String>,
    ) -> Result<Self> {
        params.validate()?;

        let salt = Salt::generate()?;
        let user = derive_key_material(password, salt.as_bytes(), &params)?;
        let data = seal(&user, &master.to_json()?)?;

        Ok(Self {
            created: Utc::now(),
            username,
            hostname,
            comment,
            kdf: KDF_SCRYPT.to_string(),
            params,
            salt: salt.as_bytes().to_vec(),
            data,
        })
    }

    /// Recover the master key with `password`.
    ///
    /// # Errors
    /// - [`Error::UnsupportedKdf`] before any derivation if the KDF is unknown
    /// - [`Error::InvalidInput`] before any derivation if the cost parameters
    ///   are malformed or exceed [`MAX_KDF_MEMORY`](cairn_crypto::MAX_KDF_MEMORY)
    /// - [`Error::Unauthenticated`] for a wrong password or tampered record
    /// - Malformed inner data
    pub fn unseal(&self, password: &[u8]) -> Result<KeyMaterial> {
        self.check_kdf()?;
        self.params.validate()?;

        let user = derive_key_material(password, &self.salt, &self.params)?;
        let plaintext = SensitiveBytes::new(open(&user, &self.data)?);
        KeyMaterial::from_json(plaintext.as_bytes())
    }

    /// Reject KDF identifiers other than scrypt.
    pub fn check_kdf(&self) -> Result<()> {
        if self.kdf != KDF_SCRYPT {
            return Err(Error::UnsupportedKdf(self.kdf.clone()));
        }
        Ok(())
    }

    /// Serialize to bytes for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> KdfParams {
        KdfParams::new(1 << 10, 8, 1).unwrap()
    }

    fn sealed(password: &[u8], master: &KeyMaterial) -> KeyRecord {
        KeyRecord::seal(
            password,
            master,
            fast(),
            "alice".to_string(),
            "laptop".to_string(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_seal_unseal() {
        let master = KeyMaterial::generate().unwrap();
        let record = sealed(b"secret", &master);

        assert_eq!(record.kdf, KDF_SCRYPT);
        assert_eq!(record.salt.len(), cairn_crypto::SALT_SIZE);
        assert!(record.unseal(b"secret").unwrap().ct_eq(&master));
    }

    #[test]
    fn test_wrong_password() {
        let master = KeyMaterial::generate().unwrap();
        let record = sealed(b"secret", &master);

        assert!(matches!(
            record.unseal(b"guess"),
            Err(Error::Unauthenticated)
        ));
    }

    #[test]
    fn test_salt_and_data_travel_together() {
        let master = KeyMaterial::generate().unwrap();
        let a = sealed(b"pw", &master);
        let mut b = sealed(b"pw", &master);

        assert_ne!(a.salt, b.salt);
        b.data = a.data.clone();
        assert!(matches!(b.unseal(b"pw"), Err(Error::Unauthenticated)));
    }

    #[test]
    fn test_json_field_names() {
        let master = KeyMaterial::generate().unwrap();
        let record = sealed(b"pw", &master);
        let value: serde_json::Value = serde_json::from_slice(&record.to_bytes().unwrap()).unwrap();

        for field in ["created", "username", "hostname", "kdf", "N", "r", "p", "salt", "data"] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
        assert!(value.get("comment").is_none());
        assert_eq!(value["N"], 1024);
        assert!(value["salt"].is_string());
    }

    #[test]
    fn test_bytes_roundtrip_keeps_record_openable() {
        let master = KeyMaterial::generate().unwrap();
        let mut record = sealed(b"pw", &master);
        record.comment = Some("backup server".to_string());

        let restored = KeyRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.comment.as_deref(), Some("backup server"));
        assert_eq!(restored.params, record.params);
        assert!(restored.unseal(b"pw").unwrap().ct_eq(&master));
    }

    #[test]
    fn test_unknown_kdf_rejected_before_derivation() {
        let master = KeyMaterial::generate().unwrap();
        let mut record = sealed(b"pw", &master);
        record.kdf = "argon2id".to_string();
        // would fail with InvalidInput if derivation were attempted
        record.params.n = 3;
        record.salt.clear();

        match record.unseal(b"pw") {
            Err(Error::UnsupportedKdf(kdf)) => assert_eq!(kdf, "argon2id"),
            other => panic!("expected UnsupportedKdf, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_oversized_cost_rejected_before_derivation() {
        let master = KeyMaterial::generate().unwrap();
        let mut record = sealed(b"pw", &master);
        record.params.n = 1 << 50;

        let restored = KeyRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.params.n, 1 << 50);
        assert!(matches!(
            restored.unseal(b"pw"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_malformed_record() {
        assert!(matches!(
            KeyRecord::from_bytes(b"{\"kdf\": \"scrypt\"}"),
            Err(Error::Serialization(_))
        ));
        assert!(KeyRecord::from_bytes(b"\x00\x01").is_err());
    }
}
