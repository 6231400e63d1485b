//! In-memory engine for orchestration tests.
//!
//! Speaks the MySQL dialect, serves a schema and fixed rows, and records
//! every executed statement so tests can inspect what a run would send to a
//! real server. `CREATE TABLE IF NOT EXISTS` statements in the shape the DDL
//! translator emits are applied to the schema.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::schema::{NormalizedColumn, NormalizedTable, SchemaSnapshot};
use crate::core::traits::{Dialect, Engine};
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};
use crate::structure_log::StructureLog;

use super::MysqlDialect;

type FailWhen = Box<dyn Fn(&str) -> bool + Send>;

/// Statements executed by a [`MemoryEngine`], shared with the test.
#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(crate) fn statements(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn matching(&self, prefix: &str) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|s| s.starts_with(prefix))
            .collect()
    }

    fn push(&self, sql: &str) {
        self.0.lock().unwrap().push(sql.to_string());
    }
}

/// Schema of a [`MemoryEngine`], shared with the test.
#[derive(Clone, Default)]
pub(crate) struct SharedSchema(Arc<Mutex<SchemaSnapshot>>);

impl SharedSchema {
    pub(crate) fn snapshot(&self) -> SchemaSnapshot {
        self.0.lock().unwrap().clone()
    }

    fn create_table(&self, table: NormalizedTable) {
        self.0
            .lock()
            .unwrap()
            .tables
            .entry(table.name.clone())
            .or_insert(table);
    }
}

pub(crate) struct MemoryEngine {
    dialect: MysqlDialect,
    schema: SharedSchema,
    rows: HashMap<String, Vec<Vec<SqlValue>>>,
    journal: Journal,
    fail_when: FailWhen,
}

impl MemoryEngine {
    pub(crate) fn new(schema: SchemaSnapshot) -> Self {
        Self {
            dialect: MysqlDialect::new(),
            schema: SharedSchema(Arc::new(Mutex::new(schema))),
            rows: HashMap::new(),
            journal: Journal::default(),
            fail_when: Box::new(|_| false),
        }
    }

    /// Rows in the table's declared column order.
    pub(crate) fn with_rows(mut self, table: &str, rows: Vec<Vec<SqlValue>>) -> Self {
        self.rows.insert(table.to_string(), rows);
        self
    }

    /// Fail every statement matching `predicate`.
    pub(crate) fn failing_when(mut self, predicate: impl Fn(&str) -> bool + Send + 'static) -> Self {
        self.fail_when = Box::new(predicate);
        self
    }

    pub(crate) fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub(crate) fn schema(&self) -> SharedSchema {
        self.schema.clone()
    }
}

/// Read back a `CREATE TABLE IF NOT EXISTS` statement rendered with backtick
/// quoting: one clause per line, columns first.
fn parse_create_table(sql: &str) -> Option<NormalizedTable> {
    let rest = sql.strip_prefix("CREATE TABLE IF NOT EXISTS `")?;
    let (name, body) = rest.split_once("` (\n")?;
    let body = body.strip_suffix(')')?;

    let mut columns = Vec::new();
    let mut composite_key = Vec::new();
    for clause in body.split(",\n") {
        if let Some(column) = clause.strip_prefix('`') {
            let (column_name, spec) = column.split_once("` ")?;
            let data_type = spec.split_whitespace().next()?;
            let mut column = NormalizedColumn::new(column_name, data_type);
            if spec.contains("NOT NULL") {
                column = column.not_null();
            }
            if spec.contains(" PRIMARY KEY") {
                column = column.primary();
            }
            columns.push(column);
        } else if let Some((_, keys)) = clause.split_once("PRIMARY KEY (") {
            composite_key = keys
                .trim_end_matches(')')
                .split(", ")
                .map(|key| key.trim_matches('`').to_string())
                .collect();
        }
    }

    for column in &mut columns {
        if composite_key.contains(&column.name) {
            *column = column.clone().primary();
        }
    }
    Some(NormalizedTable::new(name, columns))
}

#[async_trait(?Send)]
impl Engine for MemoryEngine {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }

    async fn extract_schema(&mut self, log: &mut StructureLog) -> Result<SchemaSnapshot> {
        log.header(&[("Host", "memory"), ("Database", "memory")])?;
        let schema = self.schema.snapshot();
        log.schema(&schema)?;
        Ok(schema)
    }

    async fn fetch_rows(
        &mut self,
        table: &str,
        columns: &[String],
        _log: &mut StructureLog,
    ) -> Result<Vec<Vec<SqlValue>>> {
        let schema = self.schema.snapshot();
        let def = schema
            .table(table)
            .ok_or_else(|| MigrateError::SchemaExtraction(format!("no table {}", table)))?;
        let positions: Vec<usize> = columns
            .iter()
            .filter_map(|c| def.columns.iter().position(|col| &col.name == c))
            .collect();

        Ok(self
            .rows
            .get(table)
            .map(|rows| {
                rows.iter()
                    .map(|row| positions.iter().map(|&i| row[i].clone()).collect())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.journal.push(sql);
        if (self.fail_when)(sql) {
            return Err(MigrateError::Database(sqlx::Error::Protocol(format!(
                "rejected: {}",
                sql
            ))));
        }
        if let Some(table) = parse_create_table(sql) {
            self.schema.create_table(table);
        }
        Ok(1)
    }

    async fn begin(&mut self) -> Result<()> {
        self.journal.push("START TRANSACTION");
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.journal.push("COMMIT");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.journal.push("ROLLBACK");
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::translate_table;

    #[test]
    fn test_created_tables_read_back() {
        let table = NormalizedTable::new(
            "orders",
            vec![
                NormalizedColumn::new("id", "INTEGER").primary(),
                NormalizedColumn::new("line", "INTEGER").primary(),
                NormalizedColumn::new("note", "TEXT").with_default("a, b"),
            ],
        );
        let ddl = translate_table(&MysqlDialect, &table, None, None);

        let parsed = parse_create_table(&ddl.create_table).unwrap();
        assert_eq!(parsed.name, "orders");
        assert_eq!(parsed.column_names(), vec!["id", "line", "note"]);
        assert_eq!(parsed.primary_key(), vec!["id", "line"]);
        assert_eq!(parsed.column("note").unwrap().data_type, "longtext");
        assert!(parsed.column("note").unwrap().nullable);
        assert!(parse_create_table("CREATE INDEX `x` ON `t`(`a`)").is_none());
    }
}
