//! SQL dialect boundary
//!
//! Everything that differs between relational backends goes through the
//! [`Dialect`] trait: identifier quoting, literal escaping, placeholders,
//! column types and the auto-increment / current-timestamp keywords. Only
//! [`Sqlite`] is implemented.

use crate::schema::Field;
use crate::types::StorageAffinity;

/// Text columns with a declared `max` below this length become `VARCHAR(max)`
const VARCHAR_LIMIT: i64 = 255;

/// Quote a SQL identifier to make it safe for use in queries
///
/// Internal double quotes are escaped by doubling them.
///
/// # Example
/// ```
/// use schemaforge::sql::quote_identifier;
///
/// assert_eq!(quote_identifier("User"), "\"User\"");
/// assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
/// ```
pub fn quote_identifier(identifier: &str) -> String {
    let escaped = identifier.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Encode a string as a single-quoted SQL literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Backend-specific SQL rendering
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_identifier(identifier)
    }

    fn quote_literal(&self, value: &str) -> String {
        quote_literal(value)
    }

    /// Placeholder for the 1-based `index`-th bound argument
    fn placeholder(&self, index: usize) -> String;

    /// Column type declaration for a field
    fn column_type(&self, field: &Field) -> String;

    /// Constraint suffix for an identifier primary key
    fn auto_increment_primary_key(&self) -> &'static str;

    /// Keyword producing the current timestamp inside a DEFAULT clause
    fn current_timestamp(&self) -> &'static str;

    fn boolean_literal(&self, value: bool) -> &'static str;
}

/// SQLite dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn column_type(&self, field: &Field) -> String {
        match field.field_type.affinity() {
            StorageAffinity::Integer => "INTEGER".to_string(),
            StorageAffinity::Boolean => "BOOLEAN".to_string(),
            StorageAffinity::Temporal => "DATETIME".to_string(),
            StorageAffinity::Text => match field.max {
                Some(max) if max > 0 && max < VARCHAR_LIMIT => format!("VARCHAR({})", max),
                _ => "TEXT".to_string(),
            },
        }
    }

    fn auto_increment_primary_key(&self) -> &'static str {
        "PRIMARY KEY AUTOINCREMENT"
    }

    fn current_timestamp(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }
}
