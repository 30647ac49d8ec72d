//! Local filesystem storage backend.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::backend::Backend;
use cairn_common::{Error, ObjectId, ObjectType, Result};

/// Local filesystem storage backend.
///
/// Objects live in one directory per [`ObjectType`] below the root, each in a
/// file named by its hex id:
///
/// ```text
/// <root>/keys/3f9a...
/// <root>/blobs/07c1...
/// ```
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Open (or initialize) a repository directory.
    ///
    /// # Postconditions
    /// - Root and per-type directories exist
    ///
    /// # Errors
    /// - Permission denied or other I/O failure
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        for object_type in ObjectType::ALL {
            fs::create_dir_all(root.join(object_type.dir_name()))?;
        }

        Ok(Self { root })
    }

    fn object_path(&self, object_type: ObjectType, id: &ObjectId) -> PathBuf {
        self.root
            .join(object_type.dir_name())
            .join(id.to_string())
    }

    /// Write through a uniquely named temp file, then rename into place.
    fn write_atomic(&self, target: &Path, data: &[u8]) -> Result<()> {
        let tmp_path = target.with_extension(format!("tmp.{:016x}", rand::random::<u64>()));

        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        tmp_file.write_all(data)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        if let Err(e) = fs::rename(&tmp_path, target) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        if let Some(parent) = target.parent() {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }
}

impl Backend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn create(&self, object_type: ObjectType, data: &[u8]) -> Result<ObjectId> {
        let id = ObjectId::hash(data);
        let path = self.object_path(object_type, &id);

        if path.exists() {
            debug!(object_type = %object_type, id = %id.short(), "Object already stored");
            return Ok(id);
        }

        self.write_atomic(&path, data)?;
        debug!(object_type = %object_type, id = %id.short(), size = data.len(), "Object stored");
        Ok(id)
    }

    fn get(&self, object_type: ObjectType, id: &ObjectId) -> Result<Vec<u8>> {
        let data = match fs::read(self.object_path(object_type, id)) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("{} {}", object_type, id)));
            }
            Err(e) => return Err(e.into()),
        };

        if ObjectId::hash(&data) != *id {
            return Err(Error::Storage(format!(
                "content of {} {} does not match its id",
                object_type, id
            )));
        }
        Ok(data)
    }

    fn list(&self, object_type: ObjectType) -> Result<Vec<ObjectId>> {
        let mut ids = Vec::new();

        for entry in fs::read_dir(self.root.join(object_type.dir_name()))? {
            let entry = entry?;
            // temp files and foreign names do not parse as ids
            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<ObjectId>().ok())
            {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }
}
