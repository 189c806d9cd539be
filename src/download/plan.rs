//! Byte-range planning for segmented downloads.

use super::DownloadError;

/// One contiguous byte range of the resource, fetched by a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    /// Part index, `0..parts`.
    pub index: usize,
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl PartRange {
    /// Number of bytes covered by this range.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false: planned ranges cover at least one byte.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for the `Range` request header.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Splits `total_bytes` into `parts` contiguous, non-overlapping ranges.
///
/// Every part gets `total_bytes / parts` bytes; the last one also absorbs the
/// `total_bytes % parts` remainder and always ends at `total_bytes - 1`.
///
/// # Errors
///
/// Returns [`DownloadError::EmptyResource`] when `total_bytes` is zero, and
/// [`DownloadError::InvalidPartCount`] when `parts` is zero or larger than
/// `total_bytes` (some range would be empty).
pub fn plan(total_bytes: u64, parts: usize) -> Result<Vec<PartRange>, DownloadError> {
    let count = u64::try_from(parts).unwrap_or(u64::MAX);
    if total_bytes == 0 && count > 0 {
        return Err(DownloadError::EmptyResource { parts });
    }
    if count == 0 || count > total_bytes {
        return Err(DownloadError::InvalidPartCount {
            parts,
            total_bytes,
            max: total_bytes,
        });
    }

    let part_size = total_bytes / count;
    let ranges = (0..parts)
        .zip(0..count)
        .map(|(index, i)| {
            let start = i * part_size;
            let end = if i == count - 1 {
                total_bytes - 1
            } else {
                start + part_size - 1
            };
            PartRange { index, start, end }
        })
        .collect();

    Ok(ranges)
}
