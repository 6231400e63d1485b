//! Core traits for moving schema and rows between the two engines.
//!
//! - [`Dialect`]: SQL syntax strategy for one engine
//! - [`Engine`]: an open connection that can describe its schema, stream out
//!   rows, and execute generated statements
//!
//! Either engine can play source or target depending on the run direction,
//! so a single trait covers both roles.

use async_trait::async_trait;

use crate::dialect::TypeMapping;
use crate::error::Result;
use crate::structure_log::StructureLog;

use super::schema::{NormalizedIndex, SchemaSnapshot};
use super::value::SqlValue;

/// SQL syntax strategy for one engine.
///
/// Provides engine-specific quoting and statement shapes while keeping the
/// transfer and orchestration logic engine-agnostic.
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier ("mysql", "sqlite").
    fn name(&self) -> &str;

    /// Quote an identifier (table name, column name, etc.).
    ///
    /// - MySQL: `` `identifier` ``
    /// - SQLite: `[identifier]`
    fn quote_ident(&self, name: &str) -> String;

    /// Map a column type declared by the other engine to a type of this one.
    fn map_column_type(&self, source_type: &str) -> TypeMapping;

    /// Quote a string literal.
    fn quote_text(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Insert verb that skips rows colliding with a uniqueness constraint.
    fn insert_ignore(&self) -> &str;

    /// Statement toggling foreign-key enforcement for the session.
    fn foreign_key_checks(&self, enabled: bool) -> String;

    /// Build a full-scan SELECT over `columns`, in that order.
    fn build_select(&self, table: &str, columns: &[String]) -> String {
        let cols = if columns.is_empty() {
            "*".to_string()
        } else {
            self.quote_columns(columns)
        };
        format!("SELECT {} FROM {}", cols, self.quote_ident(table))
    }

    /// Build one INSERT statement with every value inlined as a literal.
    fn build_insert(&self, table: &str, columns: &[String], values: &[SqlValue]) -> String {
        let literals = values
            .iter()
            .map(|v| v.to_sql_literal(self))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} {} ({}) VALUES({})",
            self.insert_ignore(),
            self.quote_ident(table),
            self.quote_columns(columns),
            literals
        )
    }

    /// Build a CREATE INDEX statement, named `<table>_<index>`.
    fn build_create_index(&self, table: &str, index: &NormalizedIndex) -> String {
        format!(
            "CREATE {}INDEX {} ON {}({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_ident(&format!("{}_{}", table, index.name)),
            self.quote_ident(table),
            self.quote_columns(&index.columns)
        )
    }

    /// Build a statement that removes every row of a table.
    fn build_truncate(&self, table: &str) -> String;

    /// Comma-separated quoted column list.
    fn quote_columns(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// An open connection to one engine.
///
/// Implementations hold a single session so that session state (foreign-key
/// enforcement, the open transaction) applies to every statement they run.
/// Futures are not `Send`; a run drives both engines from one task.
#[async_trait(?Send)]
pub trait Engine: Send {
    /// SQL dialect of this engine.
    fn dialect(&self) -> &dyn Dialect;

    /// Human-readable location, e.g. "mysql://db.local:3306/shop".
    fn describe(&self) -> String;

    /// Extract the normalized schema, recording it to `log`.
    ///
    /// Tables that cannot be read are skipped with a warning.
    async fn extract_schema(&mut self, log: &mut StructureLog) -> Result<SchemaSnapshot>;

    /// Read every row of `table`, projecting `columns` in order.
    ///
    /// Values that cannot be decoded faithfully are reported to `log`, once
    /// per column and problem.
    async fn fetch_rows(
        &mut self,
        table: &str,
        columns: &[String],
        log: &mut StructureLog,
    ) -> Result<Vec<Vec<SqlValue>>>;

    /// Execute one statement, returning the affected row count.
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Open a transaction.
    async fn begin(&mut self) -> Result<()>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Close the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}
