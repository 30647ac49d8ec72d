//! Common types used throughout cairn.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

/// Length of an object identifier in bytes (SHA-256 digest).
pub const ID_LENGTH: usize = 32;

/// Content address of an object in a repository store.
///
/// The identifier is the SHA-256 digest of the stored bytes and is rendered
/// as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; ID_LENGTH]);

impl ObjectId {
    /// Compute the identifier of `data`.
    pub fn hash(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut id = [0u8; ID_LENGTH];
        id.copy_from_slice(&digest);
        Self(id)
    }

    /// Abbreviated form for log output.
    pub fn short(&self) -> String {
        self.to_string()[..8].to_string()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}

impl FromStr for ObjectId {
    type Err = crate::Error;

    /// Parse a 64 character hex string.
    ///
    /// # Errors
    /// - Returns error if the length is wrong or a character is not hex
    fn from_str(s: &str) -> crate::Result<Self> {
        let mut id = [0u8; ID_LENGTH];
        hex::decode_to_slice(s, &mut id).map_err(|e| {
            crate::Error::InvalidInput(format!("Invalid object id {:?}: {}", s, e))
        })?;
        Ok(Self(id))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Coarse category of a stored object.
///
/// [`ObjectType::Key`] is reserved for password-protected key records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Blob,
    Tree,
    Snapshot,
    Key,
    Lock,
}

impl ObjectType {
    /// All object types, in a fixed order.
    pub const ALL: [ObjectType; 5] = [
        ObjectType::Blob,
        ObjectType::Tree,
        ObjectType::Snapshot,
        ObjectType::Key,
        ObjectType::Lock,
    ];

    /// Directory name used by file based stores.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blobs",
            ObjectType::Tree => "trees",
            ObjectType::Snapshot => "snapshots",
            ObjectType::Key => "keys",
            ObjectType::Lock => "locks",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Snapshot => "snapshot",
            ObjectType::Key => "key",
            ObjectType::Lock => "lock",
        };
        f.write_str(name)
    }
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Create new sensitive bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_is_content_hash() {
        let a = ObjectId::hash(b"hello");
        let b = ObjectId::hash(b"hello");
        let c = ObjectId::hash(b"world");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(
            a.to_string(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_object_id_parse() {
        let id = ObjectId::hash(b"data");
        let parsed: ObjectId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.short().len(), 8);

        let upper: ObjectId = id.to_string().to_uppercase().parse().unwrap();
        assert_eq!(upper, id);
    }

    #[test]
    fn test_object_id_parse_invalid() {
        assert!("abc".parse::<ObjectId>().is_err());
        assert!("zz".repeat(32).parse::<ObjectId>().is_err());
        assert!("ä".repeat(32).parse::<ObjectId>().is_err());
        // sign prefixes are not hex digits
        assert!(format!("+{}", "a".repeat(63)).parse::<ObjectId>().is_err());
        assert!(format!("{}00", ObjectId::hash(b"x")).parse::<ObjectId>().is_err());
    }

    #[test]
    fn test_object_id_serde_as_hex() {
        let id = ObjectId::hash(b"data");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));

        let restored: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, id);
    }

    #[test]
    fn test_object_type_names() {
        assert_eq!(ObjectType::Key.dir_name(), "keys");
        assert_eq!(ObjectType::Key.to_string(), "key");
        assert_eq!(ObjectType::ALL.len(), 5);
    }

    #[test]
    fn test_sensitive_bytes_debug_redacted() {
        let secret = SensitiveBytes::new(vec![1, 2, 3]);
        assert_eq!(format!("{:?}", secret), "SensitiveBytes([REDACTED; 3 bytes])");
        assert_eq!(secret.len(), 3);
        assert!(!secret.is_empty());
    }
}
