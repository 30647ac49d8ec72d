//! Repository key handles.
//!
//! A [`Key`] is what a password unlocks: the record it came from and the
//! master key that record protects. The password-derived user key never
//! outlives the call that needed it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::identity::{current_hostname, current_username};
use crate::iter::Decrypted;
use crate::record::KeyRecord;
use cairn_common::{Error, ObjectId, ObjectType, Result};
use cairn_crypto::{open, seal, KdfParams, KeyMaterial};
use cairn_storage::Backend;

/// Options for writing a new key record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOptions {
    /// scrypt cost parameters for the new record.
    pub kdf: KdfParams,
    /// Free-text comment stored in the record.
    pub comment: Option<String>,
    /// Store the local user and host names in the record.
    pub record_identity: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            kdf: KdfParams::interactive(),
            comment: None,
            record_identity: true,
        }
    }
}

impl CreateOptions {
    /// Set the KDF parameters.
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// Set the record comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Enable or disable recording of user and host names.
    pub fn with_identity(mut self, record_identity: bool) -> Self {
        self.record_identity = record_identity;
        self
    }

    fn build_record(&self, password: &[u8], master: &KeyMaterial) -> Result<KeyRecord> {
        let (username, hostname) = if self.record_identity {
            (current_username(), current_hostname())
        } else {
            (String::new(), String::new())
        };

        KeyRecord::seal(
            password,
            master,
            self.kdf,
            username,
            hostname,
            self.comment.clone(),
        )
    }
}

/// An opened repository key.
///
/// Immutable once constructed. The master key is zeroized when the handle is
/// dropped.
pub struct Key {
    id: ObjectId,
    record: KeyRecord,
    master: KeyMaterial,
}

impl Key {
    /// Create a new master key and store it under `password`.
    pub fn create(store: &dyn Backend, password: &[u8]) -> Result<Self> {
        Self::create_with(store, password, &CreateOptions::default())
    }

    /// Create a new master key and store it under `password`.
    ///
    /// # Postconditions
    /// - A new record exists under [`ObjectType::Key`]
    /// - The returned handle holds the freshly generated master key
    ///
    /// # Errors
    /// - Invalid KDF parameters
    /// - Random source failure
    /// - Store write failure
    pub fn create_with(
        store: &dyn Backend,
        password: &[u8],
        options: &CreateOptions,
    ) -> Result<Self> {
        debug!(backend = store.name(), "Creating repository key");

        let master = KeyMaterial::generate()?;
        let record = options.build_record(password, &master)?;
        let id = store.create(ObjectType::Key, &record.to_bytes()?)?;

        info!(id = %id.short(), "Repository key created");
        Ok(Self { id, record, master })
    }

    /// Open the key record `id` with `password`.
    ///
    /// # Errors
    /// - [`Error::NotFound`] if the record does not exist
    /// - [`Error::UnsupportedKdf`] for records using an unknown KDF
    /// - [`Error::Unauthenticated`] for a wrong password or tampered record
    pub fn open(store: &dyn Backend, id: &ObjectId, password: &[u8]) -> Result<Self> {
        debug!(id = %id.short(), "Opening key record");

        let record = KeyRecord::from_bytes(&store.get(ObjectType::Key, id)?)?;
        let master = record.unseal(password)?;

        info!(id = %id.short(), "Key record opened");
        Ok(Self {
            id: *id,
            record,
            master,
        })
    }

    /// Find the first key record that `password` opens.
    ///
    /// # Errors
    /// - [`Error::NoKeyFound`] if no record opens
    /// - Listing failure of the store
    pub fn search(store: &dyn Backend, password: &[u8]) -> Result<Self> {
        Self::search_inner(store, password, None)
    }

    /// Like [`Key::search`], checking `cancel` before each candidate.
    ///
    /// # Errors
    /// - [`Error::Cancelled`] once `cancel` is set
    pub fn search_cancellable(
        store: &dyn Backend,
        password: &[u8],
        cancel: &AtomicBool,
    ) -> Result<Self> {
        Self::search_inner(store, password, Some(cancel))
    }

    fn search_inner(
        store: &dyn Backend,
        password: &[u8],
        cancel: Option<&AtomicBool>,
    ) -> Result<Self> {
        let ids = store.list(ObjectType::Key)?;
        debug!(candidates = ids.len(), "Searching key records");

        for id in &ids {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                info!("Key search cancelled");
                return Err(Error::Cancelled);
            }

            match Self::open(store, id, password) {
                Ok(key) => return Ok(key),
                Err(e) => debug!(id = %id.short(), error = %e, "Key record did not open"),
            }
        }

        Err(Error::NoKeyFound)
    }

    /// Store a new record that wraps this handle's master key under
    /// `password`.
    pub fn add(&self, store: &dyn Backend, password: &[u8]) -> Result<ObjectId> {
        self.add_with(store, password, &CreateOptions::default())
    }

    /// Store a new record that wraps this handle's master key under
    /// `password`, with explicit options.
    ///
    /// The new record has its own salt and user key, and opens to the same
    /// master key as this one.
    pub fn add_with(
        &self,
        store: &dyn Backend,
        password: &[u8],
        options: &CreateOptions,
    ) -> Result<ObjectId> {
        let record = options.build_record(password, &self.master)?;
        let id = store.create(ObjectType::Key, &record.to_bytes()?)?;

        info!(id = %id.short(), from = %self.id.short(), "Key record added");
        Ok(id)
    }

    /// Encrypt and authenticate `plaintext` under the master key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        seal(&self.master, plaintext)
    }

    /// Verify and decrypt `blob` under the master key.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>> {
        open(&self.master, blob)
    }

    /// Lazily fetch and decrypt every object of `object_type`.
    ///
    /// # Errors
    /// - Listing failure of the store; per-object failures are yielded as
    ///   items instead
    pub fn each<'a>(
        &'a self,
        store: &'a dyn Backend,
        object_type: ObjectType,
    ) -> Result<Decrypted<'a>> {
        debug!(object_type = %object_type, "Iterating protected objects");
        Ok(Decrypted::new(store.each(object_type)?, self))
    }

    /// Id of the record this key was opened from or written to.
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn record(&self) -> &KeyRecord {
        &self.record
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.record.created
    }

    pub fn username(&self) -> &str {
        &self.record.username
    }

    pub fn hostname(&self) -> &str {
        &self.record.hostname
    }

    pub fn comment(&self) -> Option<&str> {
        self.record.comment.as_deref()
    }

    pub fn kdf_params(&self) -> &KdfParams {
        &self.record.params
    }

    pub(crate) fn master(&self) -> &KeyMaterial {
        &self.master
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Key of {}@{}, created on {}>",
            self.record.username,
            self.record.hostname,
            self.record.created.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("id", &self.id)
            .field("created", &self.record.created)
            .field("master", &self.master)
            .finish()
    }
}
