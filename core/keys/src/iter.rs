//! Lazy decryption of stored objects.

use tracing::warn;

use crate::key::Key;
use cairn_common::{ObjectId, Result};
use cairn_storage::ObjectIter;

/// Iterator over `(id, plaintext)` pairs of one object type.
///
/// Objects are fetched and decrypted one at a time as the iterator advances.
/// A fetch or verification failure is yielded as that item's error and the
/// sequence continues with the next object. The iterator is single-pass;
/// call [`Key::each`] again to restart.
pub struct Decrypted<'a> {
    inner: ObjectIter<'a>,
    key: &'a Key,
}

impl<'a> Decrypted<'a> {
    pub(crate) fn new(inner: ObjectIter<'a>, key: &'a Key) -> Self {
        Self { inner, key }
    }
}

impl Iterator for Decrypted<'_> {
    type Item = (ObjectId, Result<Vec<u8>>);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, fetched) = self.inner.next()?;
        let plaintext = fetched.and_then(|blob| self.key.decrypt(&blob));

        if let Err(e) = &plaintext {
            warn!(id = %id.short(), error = %e, "Object failed to fetch or decrypt");
        }
        Some((id, plaintext))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
