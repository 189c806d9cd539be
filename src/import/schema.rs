//! Destination table layout.
//!
//! An [`ImportSchema`] names the table and its ordered columns. The column
//! count is the record width K; the first column is the primary key and the
//! rest map positionally to the record's fields.

use super::ImportError;

/// Default destination table.
pub const DEFAULT_TABLE: &str = "padron_reducido_ruc";

/// Default column layout: the 15-field reduced taxpayer register.
pub const DEFAULT_COLUMNS: [&str; 15] = [
    "ruc",
    "business_name",
    "taxpayer_status",
    "domicile_condition",
    "ubigeo",
    "street_type",
    "street_name",
    "zone_code",
    "zone_type",
    "number",
    "interior",
    "lot",
    "department",
    "manzana",
    "kilometro",
];

/// Table name plus ordered column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSchema {
    table: String,
    columns: Vec<String>,
}

impl Default for ImportSchema {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            columns: DEFAULT_COLUMNS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ImportSchema {
    /// Builds a schema, validating every identifier.
    ///
    /// Identifiers are spliced into SQL text, so only ASCII letters, digits
    /// and underscores are accepted, and they may not start with a digit.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidSchema`] for an empty column list,
    /// duplicate columns, or a malformed identifier.
    pub fn new<I, S>(table: impl Into<String>, columns: I) -> Result<Self, ImportError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = table.into();
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();

        check_identifier(&table)?;
        if columns.is_empty() {
            return Err(ImportError::invalid_schema("at least one column is required"));
        }
        for (i, column) in columns.iter().enumerate() {
            check_identifier(column)?;
            if columns[..i].iter().any(|c| c.eq_ignore_ascii_case(column)) {
                return Err(ImportError::invalid_schema(format!(
                    "duplicate column '{column}'"
                )));
            }
        }

        Ok(Self { table, columns })
    }

    /// Table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Ordered column names; the first is the primary key.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Record width K.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// `CREATE TABLE IF NOT EXISTS` with the first column as text primary key.
    ///
    /// Identifiers are double-quoted so SQL keywords are usable as names.
    #[must_use]
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                if i == 0 {
                    format!("\"{column}\" TEXT PRIMARY KEY")
                } else {
                    format!("\"{column}\" TEXT")
                }
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            self.table,
            columns.join(", ")
        )
    }

    /// `INSERT OR REPLACE` binding one placeholder per column.
    #[must_use]
    pub fn upsert_sql(&self) -> String {
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        let columns: Vec<String> = self.columns.iter().map(|c| format!("\"{c}\"")).collect();
        format!(
            "INSERT OR REPLACE INTO \"{}\" ({}) VALUES ({placeholders})",
            self.table,
            columns.join(", ")
        )
    }
}

fn check_identifier(name: &str) -> Result<(), ImportError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ImportError::invalid_schema(format!(
            "'{name}' is not a valid identifier"
        )))
    }
}
