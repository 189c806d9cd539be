//! Progress reporting seam shared by the downloader and the importer.
//!
//! The library never renders progress itself. Callers pass a
//! [`ProgressSink`]; the CLI renders it with `indicatif`, tests record it.

use std::time::Duration;

use serde::{Serialize, Serializer};

/// Cumulative bytes written by one part worker during its current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartProgress {
    /// Part index.
    pub index: usize,
    /// Bytes written to the part's scratch file so far.
    pub written: u64,
}

/// Aggregate download progress across all parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DownloadProgress {
    /// Bytes written across all parts.
    pub downloaded: u64,
    /// Planned resource length.
    pub total: u64,
}

impl DownloadProgress {
    /// Percentage complete, `downloaded / total * 100`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.downloaded as f64 / self.total as f64 * 100.0
    }
}

/// Receives progress signals. Both methods default to doing nothing.
pub trait ProgressSink: Send + Sync {
    /// Called after every aggregated download report; never decreases.
    fn download(&self, _progress: DownloadProgress) {}

    /// Called after every batch commit with the rows imported so far.
    fn import(&self, _rows: u64) {}
}

/// Sink that discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Serializes a duration as fractional seconds.
#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) fn serialize_secs<S: Serializer>(
    value: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}
