//! File-backed slot storage.
//!
//! Each slot is one JSON file inside a directory. Writes go to a sibling
//! temporary file which is then renamed over the slot file, so a reader never
//! sees a half-written value.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{SlotStorage, StorageError};

/// Slot storage rooted at a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) the storage directory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// The storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds a slot.
    ///
    /// Characters outside `[A-Za-z0-9._-]` are replaced with `_` so keys such
    /// as `@RocketShoes:cart` are valid file names on every platform. The
    /// mapping is not injective: `@a:b` and `_a_b` name the same file, so
    /// keys sharing a directory must stay distinct after replacement.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` for empty keys or keys made only of dots.
    pub fn slot_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if name.is_empty() || name.chars().all(|c| c == '.') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.dir.join(format!("{name}.json")))
    }

    fn io_error(key: &str) -> impl FnOnce(io::Error) -> StorageError + '_ {
        move |source| StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl SlotStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key)(e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.slot_path(key)?;
        let tmp = path.with_extension("json.tmp");

        if let Err(e) = write_synced(&tmp, value).and_then(|()| fs::rename(&tmp, &path)) {
            if let Err(cleanup) = fs::remove_file(&tmp)
                && cleanup.kind() != io::ErrorKind::NotFound
            {
                warn!(path = %tmp.display(), error = %cleanup, "Failed to remove temporary slot file");
            }
            return Err(Self::io_error(key)(e));
        }

        debug!(path = %path.display(), bytes = value.len(), "Wrote slot");
        Ok(())
    }
}

/// Write `value` to a fresh file at `path` and flush it to disk.
fn write_synced(path: &Path, value: &str) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}
