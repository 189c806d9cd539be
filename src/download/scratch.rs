//! Owned scratch directory for part files.
//!
//! A [`ScratchDir`] is created per job and removed when dropped, so part files
//! never outlive the job whether the merge succeeds, fails, or the job aborts.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use super::DownloadError;
use super::constants::SCRATCH_PREFIX;

/// Scratch directory holding `part_<index>` files for one download job.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Creates a fresh scratch directory under `base`, or the system temp dir.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] if the directory cannot be created.
    pub fn create(base: Option<&Path>) -> Result<Self, DownloadError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match base {
            Some(base) => builder
                .tempdir_in(base)
                .map_err(|e| DownloadError::io(base, e))?,
            None => builder
                .tempdir()
                .map_err(|e| DownloadError::io(std::env::temp_dir(), e))?,
        };
        debug!(path = %dir.path().display(), "created scratch directory");
        Ok(Self { dir })
    }

    /// Root of the scratch directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the scratch file for part `index`.
    #[must_use]
    pub fn part_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("part_{index}"))
    }

    /// Removes the directory now, logging instead of failing on errors.
    pub fn remove(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(path = %path.display(), error = %e, "failed to remove scratch directory");
        } else {
            debug!(path = %path.display(), "removed scratch directory");
        }
    }
}
