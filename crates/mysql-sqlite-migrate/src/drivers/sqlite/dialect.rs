//! SQLite SQL dialect.

use crate::core::traits::Dialect;
use crate::dialect::{mysql_to_sqlite, TypeMapping};

/// SQLite dialect implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Create a new SQLite dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn quote_ident(&self, name: &str) -> String {
        // Brackets cannot escape a closing bracket; fall back to double quotes
        if name.contains(']') {
            format!("\"{}\"", name.replace('"', "\"\""))
        } else {
            format!("[{}]", name)
        }
    }

    fn map_column_type(&self, source_type: &str) -> TypeMapping {
        mysql_to_sqlite(source_type)
    }

    fn insert_ignore(&self) -> &str {
        "INSERT OR IGNORE INTO"
    }

    fn foreign_key_checks(&self, enabled: bool) -> String {
        format!("PRAGMA foreign_keys = {}", if enabled { "ON" } else { "OFF" })
    }

    fn build_truncate(&self, table: &str) -> String {
        format!("DELETE FROM {}", self.quote_ident(table))
    }
}
