//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// MySQL/MariaDB connection.
    pub mysql: MysqlConfig,

    /// SQLite database file.
    pub sqlite: SqliteConfig,

    /// Migration behavior.
    #[serde(default)]
    pub options: MigrationConfig,
}

/// MySQL/MariaDB connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct MysqlConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Username.
    pub user: String,

    /// Password. Never written back out.
    #[serde(default, alias = "passwd", skip_serializing)]
    pub password: String,

    /// Database name.
    pub database: String,
}

impl fmt::Debug for MysqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .finish()
    }
}

/// SQLite configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Path of the SQLite database file.
    #[serde(alias = "sqlite_file")]
    pub file: PathBuf,
}

/// Which engine the rows are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// MySQL source, SQLite target (tables are created).
    MysqlToSqlite,
    /// SQLite source, existing MySQL tables as target.
    SqliteToMysql,
}

impl Direction {
    /// Default structure log file name for this direction.
    pub fn default_log_file(&self) -> &'static str {
        match self {
            Direction::MysqlToSqlite => "mysql-sqlite.log",
            Direction::SqliteToMysql => "sqlite-mysql.log",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::MysqlToSqlite => write!(f, "mysql -> sqlite"),
            Direction::SqliteToMysql => write!(f, "sqlite -> mysql"),
        }
    }
}

/// Table allow-list, written either as `"a,b,c"` or as a YAML sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableSelection {
    List(Vec<String>),
    Csv(String),
}

impl Default for TableSelection {
    fn default() -> Self {
        TableSelection::Csv(String::new())
    }
}

impl TableSelection {
    /// Selected table names, trimmed, with empty entries removed.
    pub fn names(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            TableSelection::List(items) => items.iter().map(String::as_str).collect(),
            TableSelection::Csv(csv) => csv.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MigrationConfig {
    /// Overwrite the SQLite file (forward) or truncate the MySQL tables (reverse).
    #[serde(default, deserialize_with = "bool_or_int")]
    pub delete_existing_data: bool,

    /// Source engine: "" or "mysql" for MySQL -> SQLite, "sqlite" for the reverse.
    #[serde(default)]
    pub source: String,

    /// Tables to migrate. Empty means all.
    #[serde(default)]
    pub tables: TableSelection,

    /// Structure log path. Defaults per direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl MigrationConfig {
    /// Direction implied by `source`.
    ///
    /// Only meaningful after validation; unknown values fall back to forward.
    pub fn direction(&self) -> Direction {
        if self.source.trim().eq_ignore_ascii_case("sqlite") {
            Direction::SqliteToMysql
        } else {
            Direction::MysqlToSqlite
        }
    }

    /// Selected table names (empty means all tables).
    pub fn selected_tables(&self) -> Vec<String> {
        self.tables.names()
    }

    /// Effective structure log path.
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.direction().default_log_file()))
    }
}

/// Accepts `true`/`false` as well as the `0`/`1` integers of older config files.
fn bool_or_int<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}

fn default_mysql_port() -> u16 {
    3306
}
