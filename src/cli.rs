//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use padron_core::config::{DEFAULT_ARCHIVE, DEFAULT_DATABASE, DEFAULT_URL};
use padron_core::download::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_PARTS, MAX_PARTS, READ_TIMEOUT_SECS,
};
use padron_core::import::{DEFAULT_BATCH_SIZE, DEFAULT_MEMBER_SUFFIX, DEFAULT_TABLE};
use padron_core::RunConfig;

/// Download the SUNAT reduced taxpayer registry and load it into SQLite.
///
/// The archive is fetched as parallel byte ranges, reassembled, and its
/// pipe-delimited member is upserted into a SQLite table in batches.
#[derive(Parser, Debug)]
#[command(name = "padron")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Source URL of the archive
    #[arg(long, env = "PADRON_URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Number of parallel byte ranges (1-64)
    #[arg(short = 'p', long, env = "PADRON_PARTS", default_value_t = DEFAULT_PARTS as u8, value_parser = clap::value_parser!(u8).range(1..=MAX_PARTS as i64))]
    pub parts: u8,

    /// Path of the downloaded archive
    #[arg(short = 'a', long, env = "PADRON_ARCHIVE", default_value = DEFAULT_ARCHIVE)]
    pub archive: PathBuf,

    /// Path of the SQLite database
    #[arg(short = 'd', long, env = "PADRON_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,

    /// Base directory for scratch part files (default: system temp)
    #[arg(long, env = "PADRON_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Records committed per transaction
    #[arg(short = 'b', long, env = "PADRON_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE as u32, value_parser = clap::value_parser!(u32).range(1..))]
    pub batch_size: u32,

    /// Destination table
    #[arg(long, env = "PADRON_TABLE", default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Comma-separated column names; the first is the primary key
    #[arg(long, env = "PADRON_COLUMNS", value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Suffix of the data member inside the archive (case-insensitive)
    #[arg(long, env = "PADRON_MEMBER_SUFFIX", default_value = DEFAULT_MEMBER_SUFFIX)]
    pub member_suffix: String,

    /// Extra attempts for a part that failed transiently (0-10)
    #[arg(short = 'r', long, env = "PADRON_MAX_RETRIES", default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "PADRON_CONNECT_TIMEOUT", default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: u64,

    /// Idle timeout between body reads in seconds
    #[arg(long, env = "PADRON_READ_TIMEOUT", default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout: u64,

    /// Import an archive that is already on disk
    #[arg(long)]
    pub skip_download: bool,

    /// Do not render progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Resolves parsed arguments into a run configuration.
    pub fn to_config(&self) -> RunConfig {
        RunConfig {
            url: self.url.clone(),
            parts: usize::from(self.parts),
            archive: self.archive.clone(),
            database: self.database.clone(),
            scratch_dir: self.scratch_dir.clone(),
            batch_size: self.batch_size as usize,
            table: self.table.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            member_suffix: self.member_suffix.clone(),
            max_retries: u32::from(self.max_retries),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            read_timeout: Duration::from_secs(self.read_timeout),
            skip_download: self.skip_download,
            show_progress: !self.no_progress && !self.quiet,
        }
    }
}
