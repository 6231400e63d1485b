//! Database driver implementations.
//!
//! - [`mysql`]: MySQL/MariaDB driver
//! - [`sqlite`]: SQLite driver
//!
//! Each driver provides a `Dialect` and an `Engine`. The orchestrator holds
//! engines as `Box<dyn Engine>` so either one can be the source.

use std::collections::BTreeSet;

use tracing::warn;

use crate::error::Result;
use crate::structure_log::StructureLog;

pub mod mysql;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod memory;

pub use mysql::{MysqlDialect, MysqlEngine};
pub use sqlite::{SqliteDialect, SqliteEngine};

/// Record row decoding problems of one table scan.
pub(crate) fn report_decode_problems(
    table: &str,
    problems: BTreeSet<String>,
    log: &mut StructureLog,
) -> Result<()> {
    for problem in problems {
        warn!("{}: {}", table, problem);
        log.warning(&format!("Table {}: {}", table, problem))?;
    }
    Ok(())
}
