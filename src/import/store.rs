//! SQLite destination store and batched upsert loader.
//!
//! The store is opened with durability relaxed for bulk loading: WAL
//! journal, `synchronous = OFF`, in-memory temp storage. Each batch is one
//! transaction, so a crash leaves only whole committed batches.
//!
//! # Example
//!
//! ```no_run
//! use padron_core::import::{ImportSchema, Store};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = ImportSchema::default();
//! let store = Store::open(Path::new("padron.db")).await?;
//! store.create_table(&schema).await?;
//! let mut loader = store.loader(&schema, 50_000);
//! // loader.push(&record).await? for each record...
//! let stats = loader.finish().await?;
//! println!("{} rows in {} batches", stats.rows, stats.batches);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, instrument};

use super::record::ImportRecord;
use super::{ImportError, ImportSchema};

/// The loader is the only writer, so one connection is enough.
const MAX_CONNECTIONS: u32 = 1;

/// Destination database handle.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    path: PathBuf,
}

impl Store {
    /// Opens or creates the database at `path` with bulk-load pragmas.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::StoreOpenFailed`] if the connection fails.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn open(path: &Path) -> Result<Self, ImportError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Off);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA temp_store = MEMORY")
                        .execute(conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .map_err(|source| ImportError::StoreOpenFailed {
                path: path.to_path_buf(),
                source,
            })?;

        debug!("store opened");
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Creates the destination table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::SchemaCreateFailed`] if the DDL fails.
    #[instrument(skip(self, schema), fields(table = schema.table()))]
    pub async fn create_table(&self, schema: &ImportSchema) -> Result<(), ImportError> {
        sqlx::query(&schema.create_table_sql())
            .execute(&self.pool)
            .await
            .map_err(|source| ImportError::SchemaCreateFailed {
                table: schema.table().to_string(),
                source,
            })?;
        Ok(())
    }

    /// Starts a batched loader for `schema`.
    #[must_use]
    pub fn loader(&self, schema: &ImportSchema, batch_size: usize) -> BatchLoader {
        BatchLoader {
            pool: self.pool.clone(),
            sql: schema.upsert_sql(),
            width: schema.width(),
            batch_size: batch_size.max(1) as u64,
            tx: None,
            rows: 0,
            pending: 0,
            batches: 0,
        }
    }

    /// Database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes all connections, checkpointing the WAL.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Counters returned by [`BatchLoader::finish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Records executed and committed.
    pub rows: u64,
    /// Transactions committed.
    pub batches: u64,
}

/// Executes upserts inside one transaction per `batch_size` records.
///
/// A transaction is opened lazily on the first record of each batch, so an
/// empty input commits nothing. Dropping the loader, or a failed upsert,
/// rolls back the open batch.
pub struct BatchLoader {
    pool: SqlitePool,
    sql: String,
    width: usize,
    batch_size: u64,
    tx: Option<Transaction<'static, Sqlite>>,
    rows: u64,
    pending: u64,
    batches: u64,
}

impl BatchLoader {
    /// Upserts one record; returns the running row count if this record
    /// completed and committed a batch.
    ///
    /// # Errors
    ///
    /// - [`ImportError::FieldCountMismatch`] if the record does not match the schema width
    /// - [`ImportError::StatementPrepareFailed`] if the batch cannot begin
    /// - [`ImportError::RowExecFailed`] if the upsert fails
    /// - [`ImportError::CommitFailed`] if the batch commit fails
    pub async fn push(&mut self, record: &ImportRecord) -> Result<Option<u64>, ImportError> {
        if record.fields().len() != self.width {
            return Err(ImportError::FieldCountMismatch {
                row: self.rows + 1,
                key: record.key().to_string(),
                expected: self.width,
                found: record.fields().len(),
            });
        }

        let mut tx = match self.tx.take() {
            Some(tx) => tx,
            None => {
                let batch = self.batches + 1;
                self.pool
                    .begin()
                    .await
                    .map_err(|source| ImportError::StatementPrepareFailed { batch, source })?
            }
        };

        let mut query = sqlx::query(&self.sql);
        for field in record.fields() {
            query = query.bind(field.as_str());
        }
        query
            .execute(&mut *tx)
            .await
            .map_err(|source| ImportError::RowExecFailed {
                row: self.rows + 1,
                key: record.key().to_string(),
                source,
            })?;
        self.tx = Some(tx);

        self.rows += 1;
        self.pending += 1;
        if self.pending >= self.batch_size {
            self.commit().await?;
            return Ok(Some(self.rows));
        }
        Ok(None)
    }

    /// Commits the final partial batch and returns the totals.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::CommitFailed`] if the last commit fails.
    pub async fn finish(mut self) -> Result<LoadStats, ImportError> {
        self.commit().await?;
        Ok(LoadStats {
            rows: self.rows,
            batches: self.batches,
        })
    }

    async fn commit(&mut self) -> Result<(), ImportError> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        let batch = self.batches + 1;
        tx.commit()
            .await
            .map_err(|source| ImportError::CommitFailed { batch, source })?;
        self.batches = batch;
        debug!(batch, rows = self.pending, total_rows = self.rows, "batch committed");
        self.pending = 0;
        Ok(())
    }
}
