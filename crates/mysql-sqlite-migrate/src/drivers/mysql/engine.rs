//! MySQL/MariaDB engine: one session used as either source or target.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlSslMode};
use sqlx::{ConnectOptions, Connection};
use tracing::info;

use crate::config::MysqlConfig;
use crate::core::schema::SchemaSnapshot;
use crate::core::traits::{Dialect, Engine};
use crate::core::value::SqlValue;
use crate::drivers::report_decode_problems;
use crate::error::{MigrateError, Result};
use crate::structure_log::StructureLog;

use super::reader::{decode_row, extract_schema};
use super::MysqlDialect;

/// MySQL/MariaDB engine over a single connection.
pub struct MysqlEngine {
    conn: MySqlConnection,
    host: String,
    port: u16,
    database: String,
    dialect: MysqlDialect,
}

impl MysqlEngine {
    /// Connect using the `mysql` section of the configuration.
    pub async fn connect(config: &MysqlConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .charset("utf8mb4")
            .ssl_mode(MySqlSslMode::Preferred);

        let mut conn = options
            .connect()
            .await
            .map_err(|e| MigrateError::connection(e, "connecting to MySQL"))?;

        // Test connection
        let version: String = sqlx::query_scalar("SELECT CAST(VERSION() AS CHAR)")
            .fetch_one(&mut conn)
            .await
            .map_err(|e| MigrateError::connection(e, "testing MySQL connection"))?;

        info!(
            "Connected to MySQL {}: {}:{}/{}",
            version, config.host, config.port, config.database
        );

        Ok(Self {
            conn,
            host: config.host.clone(),
            port: config.port,
            database: config.database.clone(),
            dialect: MysqlDialect::new(),
        })
    }
}

#[async_trait(?Send)]
impl Engine for MysqlEngine {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn describe(&self) -> String {
        format!("mysql://{}:{}/{}", self.host, self.port, self.database)
    }

    async fn extract_schema(&mut self, log: &mut StructureLog) -> Result<SchemaSnapshot> {
        extract_schema(&mut self.conn, &self.host, &self.database, log).await
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
        self.execute("START TRANSACTION").await.map(|_| ())
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
            .map_err(|e| MigrateError::connection(e, "closing MySQL connection"))
    }
}
