//! Resolved run configuration.
//!
//! [`RunConfig`] holds the values a `padron` run needs after CLI and
//! environment resolution, and turns them into the library-level
//! [`DownloadOptions`] and [`ImportOptions`].

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::download::constants::{CONNECT_TIMEOUT_SECS, DEFAULT_PARTS, READ_TIMEOUT_SECS};
use crate::download::{DownloadError, DownloadOptions, HttpClient, RetryPolicy};
use crate::import::{
    DEFAULT_BATCH_SIZE, DEFAULT_COLUMNS, DEFAULT_MEMBER_SUFFIX, DEFAULT_TABLE, ImportError,
    ImportOptions, ImportSchema,
};

/// Published location of the reduced taxpayer registry.
pub const DEFAULT_URL: &str = "http://www2.sunat.gob.pe/padron_reducido_ruc.zip";

/// Default path of the downloaded archive.
pub const DEFAULT_ARCHIVE: &str = "padron_reducido_ruc.zip";

/// Default path of the SQLite database.
pub const DEFAULT_DATABASE: &str = "padron_reducido_ruc.db";

/// Configuration that cannot be turned into valid options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Download settings are invalid.
    #[error("invalid download settings: {0}")]
    Download(#[from] DownloadError),

    /// Import settings are invalid.
    #[error("invalid import settings: {0}")]
    Import(#[from] ImportError),
}

/// Everything one download-then-import run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Source URL of the archive.
    pub url: String,
    /// Concurrent byte ranges.
    pub parts: usize,
    /// Where the archive is written and read from.
    pub archive: PathBuf,
    /// Destination database.
    pub database: PathBuf,
    /// Base directory for scratch parts; system temp when `None`.
    pub scratch_dir: Option<PathBuf>,
    /// Records per transaction.
    pub batch_size: usize,
    /// Destination table.
    pub table: String,
    /// Column override; the default layout when empty.
    pub columns: Vec<String>,
    /// Data-member suffix.
    pub member_suffix: String,
    /// Extra attempts per failed part.
    pub max_retries: u32,
    /// HTTP connect timeout.
    pub connect_timeout: Duration,
    /// Idle timeout between body reads.
    pub read_timeout: Duration,
    /// Import an archive already on disk.
    pub skip_download: bool,
    /// Render progress on the terminal.
    pub show_progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            parts: DEFAULT_PARTS,
            archive: PathBuf::from(DEFAULT_ARCHIVE),
            database: PathBuf::from(DEFAULT_DATABASE),
            scratch_dir: None,
            batch_size: DEFAULT_BATCH_SIZE,
            table: DEFAULT_TABLE.to_string(),
            columns: Vec::new(),
            member_suffix: DEFAULT_MEMBER_SUFFIX.to_string(),
            max_retries: 0,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            skip_download: false,
            show_progress: true,
        }
    }
}

impl RunConfig {
    /// Builds validated download options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Download`] for an out-of-range part count.
    pub fn download_options(&self) -> Result<DownloadOptions, ConfigError> {
        let options = DownloadOptions {
            parts: self.parts,
            scratch_base: self.scratch_dir.clone(),
            retry_policy: RetryPolicy::with_max_attempts(self.max_retries.saturating_add(1)),
        };
        options.validate()?;
        Ok(options)
    }

    /// Builds validated import options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Import`] for a bad schema, batch size or suffix.
    pub fn import_options(&self) -> Result<ImportOptions, ConfigError> {
        let schema = if self.columns.is_empty() {
            ImportSchema::new(self.table.as_str(), DEFAULT_COLUMNS)?
        } else {
            ImportSchema::new(self.table.as_str(), self.columns.iter().map(String::as_str))?
        };
        let options = ImportOptions {
            batch_size: self.batch_size,
            schema,
            member_suffix: self.member_suffix.clone(),
        };
        options.validate()?;
        Ok(options)
    }

    /// HTTP client with the configured timeouts.
    #[must_use]
    pub fn http_client(&self) -> HttpClient {
        HttpClient::with_timeouts(self.connect_timeout, self.read_timeout)
    }
}
