//! SQLite database driver.
//!
//! - [`SqliteDialect`]: SQL syntax strategy
//! - [`SqliteEngine`]: catalog extraction, row reads and statement execution

mod dialect;
mod engine;
mod reader;

pub use dialect::SqliteDialect;
pub use engine::SqliteEngine;
