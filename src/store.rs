/// Persisted snapshot storage.
///
/// Keeps the most recently logged snapshot in a small JSON file so the
/// next cycle (or the next process run) can tell what changed. The file
/// is replaced atomically: a temp file is written next to it and renamed
/// over it, so a crash mid-write leaves the previous content intact.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::model::{StationSnapshot, StorageError};

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_text(&self) -> String {
        self.path.display().to_string()
    }

    fn write_error(&self, e: impl std::fmt::Display) -> StorageError {
        StorageError::Write {
            path: self.path_text(),
            message: e.to_string(),
        }
    }

    /// Load the persisted snapshot.
    ///
    /// `Ok(None)` means there is no history yet (the file does not exist).
    /// Unreadable or malformed content is an error.
    pub fn load(&self) -> Result<Option<StationSnapshot>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::Read {
                    path: self.path_text(),
                    message: e.to_string(),
                });
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                path: self.path_text(),
                message: e.to_string(),
            })
    }

    /// Replace the persisted snapshot.
    pub fn save(&self, snapshot: &StationSnapshot) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(snapshot).map_err(|e| self.write_error(e))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.write_error(e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.write_error(e))?;
        writeln!(tmp, "{}", json).map_err(|e| self.write_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.write_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.write_error(e.error))?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
