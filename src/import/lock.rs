//! Single-writer lock for a destination database.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use super::ImportError;

/// Exclusive advisory lock on `<database>.lock`, held for one import.
///
/// Released when dropped. The lock file itself is left in place.
#[derive(Debug)]
pub struct WriterLock {
    _file: File,
    path: PathBuf,
}

impl WriterLock {
    /// Takes the lock without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::StoreLocked`] if another holder has it, or
    /// [`ImportError::LockFileFailed`] if the lock file cannot be opened.
    pub fn acquire(database: &Path) -> Result<Self, ImportError> {
        let path = lock_path(database);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| ImportError::LockFileFailed {
                path: path.clone(),
                source,
            })?;

        FileExt::try_lock_exclusive(&file).map_err(|source| ImportError::StoreLocked {
            path: database.to_path_buf(),
            lock_path: path.clone(),
            source,
        })?;

        debug!(lock = %path.display(), "acquired writer lock");
        Ok(Self { _file: file, path })
    }

    /// Lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `<database>.lock`, next to the database file.
#[must_use]
pub fn lock_path(database: &Path) -> PathBuf {
    let mut name = database.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}
