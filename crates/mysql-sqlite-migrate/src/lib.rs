//! # mysql-sqlite-migrate
//!
//! Schema and data migration between MySQL/MariaDB and SQLite, in either
//! direction.
//!
//! - **MySQL → SQLite** creates the SQLite file from the MySQL catalog,
//!   translating column types, defaults, primary keys and foreign keys.
//! - **SQLite → MySQL** creates the tables MySQL lacks and loads rows into
//!   all of them, optionally truncating the ones that already existed.
//!
//! Rows are copied with `INSERT ... IGNORE` semantics, one transaction per
//! table. A structure log records both catalogs, the generated DDL and every
//! warning.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mysql_sqlite_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> mysql_sqlite_migrate::Result<()> {
//!     let config = Config::load("migrate.yaml")?;
//!     let orchestrator = Orchestrator::new(config).await?;
//!     let result = orchestrator.run().await?;
//!     println!("Migrated {} rows", result.rows_inserted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod structure_log;
pub mod transfer;

// Re-exports for convenient access
pub use crate::core::{Dialect, Engine, SchemaSnapshot, SqlValue};
pub use config::{Config, Direction, MigrationConfig, MysqlConfig, SqliteConfig, TableSelection};
pub use drivers::{MysqlEngine, SqliteEngine};
pub use error::{MigrateError, Result};
pub use orchestrator::{
    AlwaysDecline, AssumeYes, ConfirmationGate, HealthCheckResult, MigrationResult, Orchestrator,
};
pub use structure_log::StructureLog;
pub use transfer::TransferStats;
