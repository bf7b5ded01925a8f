//! A `StateStore` that keeps one JSON file per key in a directory.

use pagefig_traits::{StateStore, StoreError};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, String> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(format!("'{key}' is not a valid store key"));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl StateStore for FileStateStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key).map_err(|message| StoreError::ReadFailed {
            key: key.to_string(),
            message,
        })?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::ReadFailed {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Writes through a temporary file and a rename, so a reader never sees
    /// a half-written value.
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let failed = |message: String| StoreError::WriteFailed {
            key: key.to_string(),
            message,
        };
        let path = self.path_for(key).map_err(failed)?;
        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| failed(e.to_string()))?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| failed(e.to_string()))?;
        tmp.persist(&path).map_err(|e| failed(e.error.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key).map_err(|message| StoreError::WriteFailed {
            key: key.to_string(),
            message,
        })?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
