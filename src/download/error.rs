//! Error types for the download module.
//!
//! Transfer failures (probe, part fetch) and assembly failures (merge I/O,
//! size verification) share one enum so a job reports a single error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while downloading and assembling a segmented file.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The metadata probe did not yield a usable `Content-Length`.
    #[error("size unavailable for {url}: {reason}")]
    SizeUnavailable {
        /// The probed URL.
        url: String,
        /// Why the header could not be used.
        reason: String,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The probed resource has no bytes to split.
    #[error("resource is empty: nothing to split into {parts} parts")]
    EmptyResource {
        /// Requested part count.
        parts: usize,
    },

    /// The part count cannot split the resource into non-empty ranges.
    #[error("invalid part count {parts}{}: must be between 1 and {max}", size_hint(.total_bytes))]
    InvalidPartCount {
        /// Requested part count.
        parts: usize,
        /// Total resource length, or 0 when checked before the size is known.
        total_bytes: u64,
        /// Largest acceptable part count for this resource.
        max: u64,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The server answered a ranged request with something other than the range.
    #[error("server did not honor range bytes={start}-{end} for {url} (HTTP {status})")]
    RangeNotHonored {
        /// The requested URL.
        url: String,
        /// The status the server returned instead of 206.
        status: u16,
        /// First requested byte.
        start: u64,
        /// Last requested byte (inclusive).
        end: u64,
    },

    /// A part body ended before (or after) its planned length.
    #[error("part {index} wrote {actual_bytes} bytes, expected {expected_bytes}")]
    ShortPart {
        /// Part index.
        index: usize,
        /// Planned range length.
        expected_bytes: u64,
        /// Bytes actually written to the scratch file.
        actual_bytes: u64,
    },

    /// File system error (scratch file, output file, scratch directory).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// One part failed; the job was aborted and sibling parts cancelled.
    #[error("part {index} failed: {source}")]
    PartFetchFailed {
        /// Index of the failed part.
        index: usize,
        /// What went wrong with it.
        #[source]
        source: Box<DownloadError>,
    },

    /// All workers joined but the bytes on disk do not add up to the resource.
    #[error("incomplete download: expected {expected_bytes} bytes, got {actual_bytes}")]
    IncompleteDownload {
        /// Planned total.
        expected_bytes: u64,
        /// Bytes actually present.
        actual_bytes: u64,
    },

    /// Concatenating the part files into the output failed.
    #[error("failed to assemble {path}: {source}")]
    Assembly {
        /// Destination file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The job was cancelled before the part completed.
    #[error("download cancelled")]
    Cancelled,

    /// A worker task panicked or was aborted by the runtime.
    #[error("part {index} worker terminated abnormally: {reason}")]
    WorkerPanicked {
        /// Part index of the worker.
        index: usize,
        /// Join error text.
        reason: String,
    },
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn size_hint(total_bytes: &u64) -> String {
    if *total_bytes == 0 {
        String::new()
    } else {
        format!(" for {total_bytes} bytes")
    }
}

impl DownloadError {
    /// Creates a size-unavailable error.
    pub fn size_unavailable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SizeUnavailable {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a network or timeout error depending on the reqwest error kind.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an assembly error.
    pub fn assembly(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Assembly {
            path: path.into(),
            source,
        }
    }

    /// Wraps an error with the index of the part that produced it.
    #[must_use]
    pub fn part_failed(index: usize, source: DownloadError) -> Self {
        Self::PartFetchFailed {
            index,
            source: Box::new(source),
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url or path the source error does not carry. Use the constructors above.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_size_unavailable_display() {
        let error = DownloadError::size_unavailable("http://host/f.zip", "missing Content-Length");
        let msg = error.to_string();
        assert!(msg.contains("http://host/f.zip"), "Expected URL in: {msg}");
        assert!(msg.contains("missing Content-Length"), "Expected reason in: {msg}");
    }

    #[test]
    fn test_invalid_part_count_display() {
        let error = DownloadError::InvalidPartCount {
            parts: 20,
            total_bytes: 5,
            max: 5,
        };
        let msg = error.to_string();
        assert!(msg.contains("20"), "Expected part count in: {msg}");
        assert!(msg.contains("5 bytes"), "Expected size in: {msg}");
    }

    #[test]
    fn test_invalid_part_count_before_probe_omits_size() {
        let error = DownloadError::InvalidPartCount {
            parts: 70,
            total_bytes: 0,
            max: 64,
        };
        assert_eq!(
            error.to_string(),
            "invalid part count 70: must be between 1 and 64"
        );
    }

    #[test]
    fn test_empty_resource_display() {
        let msg = DownloadError::EmptyResource { parts: 10 }.to_string();
        assert!(msg.contains("empty"), "Expected emptiness in: {msg}");
        assert!(!msg.contains("between 1 and 0"), "Unexpected bound in: {msg}");
    }

    #[test]
    fn test_range_not_honored_display() {
        let error = DownloadError::RangeNotHonored {
            url: "http://host/f.zip".to_string(),
            status: 200,
            start: 333,
            end: 665,
        };
        let msg = error.to_string();
        assert!(msg.contains("bytes=333-665"), "Expected range in: {msg}");
        assert!(msg.contains("HTTP 200"), "Expected status in: {msg}");
    }

    #[test]
    fn test_part_failed_keeps_source() {
        let error = DownloadError::part_failed(3, DownloadError::http_status("http://h/f", 503));
        let msg = error.to_string();
        assert!(msg.contains("part 3"), "Expected index in: {msg}");
        assert!(msg.contains("503"), "Expected cause in: {msg}");
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_incomplete_download_display() {
        let error = DownloadError::IncompleteDownload {
            expected_bytes: 1000,
            actual_bytes: 667,
        };
        let msg = error.to_string();
        assert!(msg.contains("1000"));
        assert!(msg.contains("667"));
    }

    #[test]
    fn test_io_display_has_path() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = DownloadError::io(PathBuf::from("/tmp/part_0"), io_error);
        assert!(error.to_string().contains("/tmp/part_0"));
    }
}
