//! In-memory storage backend for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::backend::Backend;
use cairn_common::{Error, ObjectId, ObjectType, Result};

type Objects = HashMap<ObjectType, BTreeMap<ObjectId, Vec<u8>>>;

/// In-memory storage backend.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop.
#[derive(Default)]
pub struct MemoryBackend {
    storage: RwLock<Objects>,
}

impl MemoryBackend {
    /// Create a new empty memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the bytes stored under `id` without rehashing.
    ///
    /// Only meant for simulating on-disk corruption in tests of callers.
    pub fn overwrite(&self, object_type: ObjectType, id: &ObjectId, data: Vec<u8>) -> Result<()> {
        let mut storage = self.write()?;
        match storage.get_mut(&object_type).and_then(|m| m.get_mut(id)) {
            Some(slot) => {
                *slot = data;
                Ok(())
            }
            None => Err(Error::NotFound(format!("{} {}", object_type, id))),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Objects>> {
        self.storage
            .read()
            .map_err(|_| Error::Storage("memory backend lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Objects>> {
        self.storage
            .write()
            .map_err(|_| Error::Storage("memory backend lock poisoned".to_string()))
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn create(&self, object_type: ObjectType, data: &[u8]) -> Result<ObjectId> {
        let id = ObjectId::hash(data);
        self.write()?
            .entry(object_type)
            .or_default()
            .entry(id)
            .or_insert_with(|| data.to_vec());
        Ok(id)
    }

    fn get(&self, object_type: ObjectType, id: &ObjectId) -> Result<Vec<u8>> {
        self.read()?
            .get(&object_type)
            .and_then(|m| m.get(id))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{} {}", object_type, id)))
    }

    fn list(&self, object_type: ObjectType) -> Result<Vec<ObjectId>> {
        Ok(self
            .read()?
            .get(&object_type)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default())
    }
}
