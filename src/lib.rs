//! Padron Core Library
//!
//! Fetches the SUNAT reduced taxpayer registry as one large ZIP archive and
//! loads it into SQLite.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - Segmented HTTP range downloader
//! - [`import`] - Streaming ZIP to SQLite importer
//! - [`progress`] - Progress reporting seam used by both
//! - [`config`] - Resolved run configuration
//!
//! The two components only meet through the archive file on disk: the
//! importer starts after the download has been assembled.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod import;
pub mod progress;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{ConfigError, RunConfig};
pub use download::{
    AssembledFile, DownloadError, DownloadOptions, HttpClient, RetryPolicy, SegmentedDownloader,
};
pub use import::{ImportError, ImportOptions, ImportSchema, ImportSummary, Importer};
pub use progress::{DownloadProgress, NoProgress, ProgressSink};
