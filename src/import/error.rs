//! Error types for the import module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort an import run.
///
/// Batches committed before the failure stay persisted.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The archive file could not be opened or is not a ZIP archive.
    #[error("cannot open archive {path}: {source}")]
    ArchiveOpenFailed {
        /// Archive path.
        path: PathBuf,
        /// Underlying ZIP error.
        #[source]
        source: zip::result::ZipError,
    },

    /// No archive entry name ends with the data-file suffix.
    #[error("no member ending in '{suffix}' found in {path}")]
    MemberNotFound {
        /// Archive path.
        path: PathBuf,
        /// Suffix searched for (case-insensitive).
        suffix: String,
    },

    /// Reading or splitting the member's byte stream failed.
    #[error("failed reading {member} at line {line}: {reason}")]
    ScanFailed {
        /// Member name inside the archive.
        member: String,
        /// 1-based line number being read.
        line: u64,
        /// What went wrong.
        reason: String,
    },

    /// Table or column configuration is unusable.
    #[error("invalid import schema: {reason}")]
    InvalidSchema {
        /// What is wrong with the schema.
        reason: String,
    },

    /// The database could not be opened or configured.
    #[error("cannot open database {path}: {source}")]
    StoreOpenFailed {
        /// Database path.
        path: PathBuf,
        /// Underlying sqlx error.
        #[source]
        source: sqlx::Error,
    },

    /// Another import holds the writer lock for this database.
    #[error("database {path} is locked by another import (lock file {lock_path})")]
    StoreLocked {
        /// Database path.
        path: PathBuf,
        /// Lock file path.
        lock_path: PathBuf,
        /// Underlying IO error from the lock attempt.
        #[source]
        source: std::io::Error,
    },

    /// The lock file next to the database could not be opened.
    #[error("cannot open lock file {path}: {source}")]
    LockFileFailed {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Creating the destination table failed.
    #[error("cannot create table {table}: {source}")]
    SchemaCreateFailed {
        /// Table name.
        table: String,
        /// Underlying sqlx error.
        #[source]
        source: sqlx::Error,
    },

    /// Opening a batch transaction failed.
    #[error("cannot start batch {batch}: {source}")]
    StatementPrepareFailed {
        /// 1-based batch number.
        batch: u64,
        /// Underlying sqlx error.
        #[source]
        source: sqlx::Error,
    },

    /// Executing the upsert for one record failed.
    #[error("upsert failed for row {row} (key '{key}'): {source}")]
    RowExecFailed {
        /// 1-based record number.
        row: u64,
        /// Unique identifier of the failing record.
        key: String,
        /// Underlying sqlx error.
        #[source]
        source: sqlx::Error,
    },

    /// A record's field count differs from the schema width.
    #[error("row {row} (key '{key}') has {found} fields, expected {expected}")]
    FieldCountMismatch {
        /// 1-based record number.
        row: u64,
        /// Unique identifier of the offending record.
        key: String,
        /// Schema width.
        expected: usize,
        /// Fields carried by the record.
        found: usize,
    },

    /// Committing a batch failed.
    #[error("commit of batch {batch} failed: {source}")]
    CommitFailed {
        /// 1-based batch number.
        batch: u64,
        /// Underlying sqlx error.
        #[source]
        source: sqlx::Error,
    },

    /// The blocking reader task panicked or was cancelled.
    #[error("archive reader task failed: {reason}")]
    ReaderFailed {
        /// Join error description.
        reason: String,
    },
}

impl ImportError {
    /// Creates an `InvalidSchema` error.
    pub fn invalid_schema(reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            reason: reason.into(),
        }
    }

    /// Creates a `ScanFailed` error.
    pub fn scan(member: impl Into<String>, line: u64, reason: impl Into<String>) -> Self {
        Self::ScanFailed {
            member: member.into(),
            line,
            reason: reason.into(),
        }
    }
}
