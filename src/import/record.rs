//! Pipe-delimited record parsing.

/// Lines starting with this marker are the column header, not data.
pub const HEADER_PREFIX: &str = "RUC|";

/// Field delimiter.
pub const DELIMITER: char = '|';

/// How a record's field count compared to the schema width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// Exactly K fields.
    Exact,
    /// Fewer than K fields; `missing` empty fields were appended.
    Padded {
        /// Number of fields added.
        missing: usize,
    },
    /// More than K fields; `extra` trailing fields were dropped.
    Truncated {
        /// Number of fields dropped.
        extra: usize,
    },
}

/// One data line as exactly K fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    fields: Vec<String>,
    shape: RecordShape,
}

impl ImportRecord {
    /// Unique identifier (field 0).
    #[must_use]
    pub fn key(&self) -> &str {
        self.fields.first().map_or("", String::as_str)
    }

    /// All K fields in column order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether the source line had to be padded or truncated.
    #[must_use]
    pub fn shape(&self) -> RecordShape {
        self.shape
    }
}

/// Result of parsing one decoded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Column header line; skipped.
    Header,
    /// Empty line; skipped.
    Blank,
    /// Data record.
    Record(ImportRecord),
}

/// Parses one line into a record of exactly `width` fields.
///
/// Short lines are padded with empty fields and long lines truncated to the
/// first `width`; neither is an error.
#[must_use]
pub fn parse_line(line: &str, width: usize) -> ParsedLine {
    if line.starts_with(HEADER_PREFIX) {
        return ParsedLine::Header;
    }
    if line.is_empty() {
        return ParsedLine::Blank;
    }

    let mut fields: Vec<String> = Vec::with_capacity(width);
    let mut extra = 0usize;
    for field in line.split(DELIMITER) {
        if fields.len() < width {
            fields.push(field.to_string());
        } else {
            extra += 1;
        }
    }

    let shape = if extra > 0 {
        RecordShape::Truncated { extra }
    } else if fields.len() < width {
        let missing = width - fields.len();
        fields.resize(width, String::new());
        RecordShape::Padded { missing }
    } else {
        RecordShape::Exact
    };

    ParsedLine::Record(ImportRecord { fields, shape })
}
