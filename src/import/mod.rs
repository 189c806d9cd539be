//! Streaming ZIP to SQLite importer.
//!
//! Reads the pipe-delimited data member of a ZIP archive, decodes it from
//! ISO-8859-1, and upserts one row per record in batched transactions.
//!
//! # Pipeline
//!
//! ```text
//! WriterLock -> stream_member (blocking thread) --lines--> parse_line -> BatchLoader
//! ```
//!
//! The archive is read on a blocking thread and handed over a bounded
//! channel, so memory use does not depend on member size. The loader is the
//! only writer and runs sequentially.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use padron_core::import::{ImportOptions, Importer};
//! use padron_core::NoProgress;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let importer = Importer::new(ImportOptions::default())?;
//! let summary = importer
//!     .import(Path::new("padron.zip"), Path::new("padron.db"), Arc::new(NoProgress))
//!     .await?;
//! println!("{} rows", summary.rows);
//! # Ok(())
//! # }
//! ```

mod archive;
mod decode;
mod error;
mod lock;
mod record;
mod schema;
mod store;

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

pub use archive::{MemberEvent, locate_member, stream_member};
pub use decode::{Latin1Lines, MAX_LINE_BYTES, latin1_to_string};
pub use error::ImportError;
pub use lock::{WriterLock, lock_path};
pub use record::{DELIMITER, HEADER_PREFIX, ImportRecord, ParsedLine, RecordShape, parse_line};
pub use schema::{DEFAULT_COLUMNS, DEFAULT_TABLE, ImportSchema};
pub use store::{BatchLoader, LoadStats, Store};

use crate::progress::ProgressSink;

/// Default records per transaction.
pub const DEFAULT_BATCH_SIZE: usize = 50_000;

/// Default data-member suffix.
pub const DEFAULT_MEMBER_SUFFIX: &str = ".txt";

/// Lines buffered between the archive reader and the loader.
const LINE_CHANNEL_CAPACITY: usize = 4096;

/// Tunables for an import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Records per committed transaction.
    pub batch_size: usize,
    /// Destination table and column layout.
    pub schema: ImportSchema,
    /// Suffix identifying the data member (case-insensitive).
    pub member_suffix: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            schema: ImportSchema::default(),
            member_suffix: DEFAULT_MEMBER_SUFFIX.to_string(),
        }
    }
}

impl ImportOptions {
    /// Checks batch size and member suffix.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidSchema`] for a zero batch size or an
    /// empty suffix.
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.batch_size == 0 {
            return Err(ImportError::invalid_schema("batch size must be at least 1"));
        }
        if self.member_suffix.is_empty() {
            return Err(ImportError::invalid_schema("member suffix must not be empty"));
        }
        Ok(())
    }
}

/// Outcome of a successful import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    /// Archive member that was imported.
    pub member: String,
    /// Records upserted.
    pub rows: u64,
    /// Transactions committed.
    pub batches: u64,
    /// Header lines skipped.
    pub skipped_headers: u64,
    /// Blank lines skipped.
    pub blank_lines: u64,
    /// Records padded with empty trailing fields.
    pub padded_rows: u64,
    /// Records truncated to the schema width.
    pub truncated_rows: u64,
    /// Wall-clock duration.
    #[serde(serialize_with = "crate::progress::serialize_secs")]
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct LineCounts {
    headers: u64,
    blanks: u64,
    padded: u64,
    truncated: u64,
}

/// Archive-to-database importer.
#[derive(Debug, Clone)]
pub struct Importer {
    options: ImportOptions,
}

impl Importer {
    /// Creates an importer with validated options.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidSchema`] if the options are unusable.
    pub fn new(options: ImportOptions) -> Result<Self, ImportError> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Returns the configured options.
    #[must_use]
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Imports the data member of `archive` into `database`.
    ///
    /// Holds the writer lock for the whole run. Any error aborts the run;
    /// batches committed before it remain.
    ///
    /// # Errors
    ///
    /// Returns the first [`ImportError`] raised by locking, reading,
    /// opening the store, or loading.
    #[instrument(skip(self, sink), fields(archive = %archive.display(), database = %database.display()))]
    pub async fn import(
        &self,
        archive: &Path,
        database: &Path,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<ImportSummary, ImportError> {
        let started = Instant::now();
        let _lock = WriterLock::acquire(database)?;

        let (tx, mut rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let reader = spawn_reader(archive, &self.options.member_suffix, tx);

        let member = match rx.recv().await {
            Some(MemberEvent::Located { name, size }) => {
                debug!(member = %name, size, "archive member located");
                name
            }
            _ => {
                drop(rx);
                join_reader(reader).await?;
                return Err(ImportError::ReaderFailed {
                    reason: "reader stopped before locating a member".to_string(),
                });
            }
        };

        let store = Store::open(database).await?;
        let result = self.load(&store, &mut rx, sink).await;
        drop(rx);
        let reader_result = join_reader(reader).await;

        let loaded = match (result, reader_result) {
            (Ok(loaded), Ok(())) => Ok(loaded),
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
        };
        let outcome = match loaded {
            Ok((loader, counts)) => loader.finish().await.map(|stats| (stats, counts)),
            Err(e) => Err(e),
        };
        store.close().await;
        let (stats, counts) = outcome?;

        let summary = ImportSummary {
            member,
            rows: stats.rows,
            batches: stats.batches,
            skipped_headers: counts.headers,
            blank_lines: counts.blanks,
            padded_rows: counts.padded,
            truncated_rows: counts.truncated,
            elapsed: started.elapsed(),
        };
        if summary.padded_rows > 0 || summary.truncated_rows > 0 {
            warn!(
                padded = summary.padded_rows,
                truncated = summary.truncated_rows,
                width = self.options.schema.width(),
                "some records did not match the schema width"
            );
        }
        info!(
            rows = summary.rows,
            batches = summary.batches,
            elapsed_ms = summary.elapsed.as_millis(),
            "import complete"
        );
        Ok(summary)
    }

    /// Parses and upserts every line; leaves the last partial batch open.
    async fn load(
        &self,
        store: &Store,
        rx: &mut mpsc::Receiver<MemberEvent>,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<(BatchLoader, LineCounts), ImportError> {
        let schema = &self.options.schema;
        store.create_table(schema).await?;

        let width = schema.width();
        let mut loader = store.loader(schema, self.options.batch_size);
        let mut counts = LineCounts::default();

        while let Some(event) = rx.recv().await {
            let MemberEvent::Line(line) = event else {
                continue;
            };
            match parse_line(&line, width) {
                ParsedLine::Header => counts.headers += 1,
                ParsedLine::Blank => counts.blanks += 1,
                ParsedLine::Record(record) => {
                    match record.shape() {
                        RecordShape::Padded { .. } => counts.padded += 1,
                        RecordShape::Truncated { .. } => counts.truncated += 1,
                        RecordShape::Exact => {}
                    }
                    if let Some(rows) = loader.push(&record).await? {
                        debug!(rows, "batch committed");
                        sink.import(rows);
                    }
                }
            }
        }

        Ok((loader, counts))
    }
}

fn spawn_reader(
    archive: &Path,
    suffix: &str,
    tx: mpsc::Sender<MemberEvent>,
) -> JoinHandle<Result<(), ImportError>> {
    let archive = archive.to_path_buf();
    let suffix = suffix.to_string();
    tokio::task::spawn_blocking(move || {
        stream_member(&archive, &suffix, |event| {
            if tx.blocking_send(event).is_err() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
    })
}

async fn join_reader(handle: JoinHandle<Result<(), ImportError>>) -> Result<(), ImportError> {
    handle.await.map_err(|e| ImportError::ReaderFailed {
        reason: e.to_string(),
    })?
}
