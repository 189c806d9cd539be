//! ZIP member lookup and streaming.
//!
//! Runs on a blocking thread: the archive is opened with `std::fs`, the data
//! member is found by suffix, and its decoded lines are handed to a callback
//! one at a time.

use std::io::{BufReader, Read, Seek};
use std::ops::ControlFlow;
use std::path::Path;

use tracing::{debug, info, instrument};
use zip::ZipArchive;
use zip::result::ZipError;

use super::ImportError;
use super::decode::Latin1Lines;

/// Events produced while streaming a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberEvent {
    /// The data member was found; always the first event.
    Located {
        /// Entry name inside the archive.
        name: String,
        /// Uncompressed size in bytes.
        size: u64,
    },
    /// One decoded line, terminator removed.
    Line(String),
}

/// Returns index and name of the first entry whose name ends with `suffix`,
/// compared case-insensitively. Directories are ignored.
///
/// # Errors
///
/// Returns [`ImportError::ArchiveOpenFailed`] if an entry header is corrupt.
pub fn locate_member<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &Path,
    suffix: &str,
) -> Result<Option<(usize, String)>, ImportError> {
    let suffix = suffix.to_ascii_lowercase();
    for index in 0..archive.len() {
        let entry = archive
            .by_index_raw(index)
            .map_err(|source| archive_error(path, source))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name();
        if name.to_ascii_lowercase().ends_with(&suffix) {
            debug!(index, name, "matched archive member");
            return Ok(Some((index, name.to_string())));
        }
    }
    Ok(None)
}

/// Opens `path`, locates the data member, and feeds its lines to `emit`.
///
/// `emit` returning [`ControlFlow::Break`] stops reading early without error.
///
/// # Errors
///
/// - [`ImportError::ArchiveOpenFailed`] if the file is missing or not a ZIP
/// - [`ImportError::MemberNotFound`] if no entry matches `suffix`
/// - [`ImportError::ScanFailed`] on read/inflate errors or an overlong line
#[instrument(skip(emit), fields(path = %path.display()))]
pub fn stream_member<F>(path: &Path, suffix: &str, mut emit: F) -> Result<(), ImportError>
where
    F: FnMut(MemberEvent) -> ControlFlow<()>,
{
    let file = std::fs::File::open(path).map_err(|e| archive_error(path, ZipError::Io(e)))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|source| archive_error(path, source))?;

    let Some((index, name)) = locate_member(&mut archive, path, suffix)? else {
        return Err(ImportError::MemberNotFound {
            path: path.to_path_buf(),
            suffix: suffix.to_string(),
        });
    };

    let member = archive
        .by_index(index)
        .map_err(|source| archive_error(path, source))?;
    let size = member.size();
    info!(member = %name, size, "reading archive member");
    if emit(MemberEvent::Located {
        name: name.clone(),
        size,
    })
    .is_break()
    {
        return Ok(());
    }

    let mut lines = Latin1Lines::new(BufReader::new(member));
    let mut line_no = 0u64;
    loop {
        let line = lines
            .next_line()
            .map_err(|e| ImportError::scan(&name, line_no + 1, e.to_string()))?;
        let Some(line) = line else {
            break;
        };
        line_no += 1;
        if emit(MemberEvent::Line(line)).is_break() {
            debug!(line = line_no, "consumer stopped reading");
            break;
        }
    }

    debug!(lines = line_no, "finished reading archive member");
    Ok(())
}

fn archive_error(path: &Path, source: ZipError) -> ImportError {
    ImportError::ArchiveOpenFailed {
        path: path.to_path_buf(),
        source,
    }
}
