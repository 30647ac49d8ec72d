//! Store contract consumed by the key subsystem.

use cairn_common::{ObjectId, ObjectType, Result};

/// Lazy sequence of stored objects with per-item fetch results.
pub type ObjectIter<'a> = Box<dyn Iterator<Item = (ObjectId, Result<Vec<u8>>)> + 'a>;

/// A key/value object store addressed by content id and object type.
///
/// Implementations guard their own state; all methods take `&self` so a
/// backend can be shared between threads.
pub trait Backend: Send + Sync {
    /// Get the backend name (e.g., "memory", "local").
    fn name(&self) -> &str;

    /// Persist a new object and return its identifier.
    ///
    /// # Postconditions
    /// - The returned id is the SHA-256 digest of `data`
    /// - Storing identical bytes twice yields the same id
    fn create(&self, object_type: ObjectType, data: &[u8]) -> Result<ObjectId>;

    /// Fetch an object by identifier.
    ///
    /// # Errors
    /// - [`Error::NotFound`](cairn_common::Error::NotFound) if no such object exists
    fn get(&self, object_type: ObjectType, id: &ObjectId) -> Result<Vec<u8>>;

    /// Enumerate all objects of a type, sorted by id.
    fn list(&self, object_type: ObjectType) -> Result<Vec<ObjectId>>;

    /// Iterate over all objects of a type.
    ///
    /// The listing is taken once up front; each object is fetched lazily when
    /// the iterator reaches it, and a failed fetch is yielded as that item's
    /// error without ending the sequence.
    fn each(&self, object_type: ObjectType) -> Result<ObjectIter<'_>> {
        let ids = self.list(object_type)?;
        Ok(Box::new(ids.into_iter().map(move |id| {
            let data = self.get(object_type, &id);
            (id, data)
        })))
    }
}
