//! ISO-8859-1 line decoding.
//!
//! Every Latin-1 byte is the Unicode scalar with the same value, so decoding
//! is total and needs no lookup table. Lines are read one at a time from a
//! [`BufRead`]; memory use is bounded by the longest accepted line.

use std::io::{self, BufRead, Read};

/// Longest accepted line, excluding the terminator (1 MiB).
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Decodes ISO-8859-1 bytes into a UTF-8 `String`.
#[must_use]
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Reads `\n`-terminated Latin-1 lines and yields them as UTF-8.
///
/// A trailing `\r` is stripped, so CRLF files decode the same as LF files.
#[derive(Debug)]
pub struct Latin1Lines<R> {
    reader: R,
    buf: Vec<u8>,
    max_line_bytes: usize,
}

impl<R: BufRead> Latin1Lines<R> {
    /// Wraps `reader` with the default line limit.
    pub fn new(reader: R) -> Self {
        Self::with_max_line_bytes(reader, MAX_LINE_BYTES)
    }

    /// Wraps `reader` with a custom line limit.
    pub fn with_max_line_bytes(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            max_line_bytes,
        }
    }

    /// Returns the next decoded line, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Propagates read errors, and returns [`io::ErrorKind::InvalidData`]
    /// for a line longer than the limit.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        // Room for a full-length line plus its CRLF terminator.
        let limit = self.max_line_bytes as u64 + 2;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.buf)?;
        if read == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        if self.buf.len() > self.max_line_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line exceeds {} bytes", self.max_line_bytes),
            ));
        }

        Ok(Some(latin1_to_string(&self.buf)))
    }
}
