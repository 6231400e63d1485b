//! SQLite engine: one connection to a database file.

use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::info;

use crate::core::schema::SchemaSnapshot;
use crate::core::traits::{Dialect, Engine};
use crate::core::value::SqlValue;
use crate::drivers::report_decode_problems;
use crate::error::{MigrateError, Result};
use crate::structure_log::StructureLog;

use super::reader::{decode_row, extract_schema};
use super::SqliteDialect;

/// SQLite engine over a single connection.
pub struct SqliteEngine {
    conn: SqliteConnection,
    location: String,
    dialect: SqliteDialect,
}

impl SqliteEngine {
    /// Open the database file, creating it when `create` is set.
    pub async fn open(path: &Path, create: bool) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create);
        Self::connect_with(options, path.display().to_string()).await
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect_with(options, ":memory:".to_string()).await
    }

    async fn connect_with(options: SqliteConnectOptions, location: String) -> Result<Self> {
        // Rows are copied table by table in name order, so parents may arrive
        // after their children
        let options = options.foreign_keys(false);

        let mut conn = options.connect().await.map_err(|e| {
            MigrateError::connection(e, format!("opening SQLite database {}", location))
        })?;

        let version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&mut conn)
            .await
            .map_err(|e| MigrateError::connection(e, "testing SQLite connection"))?;

        info!("Opened SQLite {} database: {}", version, location);

        Ok(Self {
            conn,
            location,
            dialect: SqliteDialect::new(),
        })
    }
}

#[async_trait(?Send)]
impl Engine for SqliteEngine {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn describe(&self) -> String {
        format!("sqlite://{}", self.location)
    }

    async fn extract_schema(&mut self, log: &mut StructureLog) -> Result<SchemaSnapshot> {
        extract_schema(&mut self.conn, &self.location, log).await
    }

    async fn fetch_rows(
        &mut self,
        table: &str,
        columns: &[String],
        log: &mut StructureLog,
    ) -> Result<Vec<Vec<SqlValue>>> {
        let sql = self.dialect.build_select(table, columns);
        let rows = sqlx::raw_sql(&sql).fetch_all(&mut self.conn).await?;

        let mut problems = BTreeSet::new();
        let values = rows
            .iter()
            .map(|row| decode_row(row, &mut problems))
            .collect();
        report_decode_problems(table, problems, log)?;
        Ok(values)
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let result = sqlx::raw_sql(sql).execute(&mut self.conn).await?;
        Ok(result.rows_affected())
    }

    async fn begin(&mut self) -> Result<()> {
        self.execute("BEGIN").await.map(|_| ())
    }

    async fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT").await.map(|_| ())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK").await.map(|_| ())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| MigrateError::connection(e, "closing SQLite connection"))
    }
}
