//! MySQL/MariaDB database driver.
//!
//! - [`MysqlDialect`]: SQL syntax strategy
//! - [`MysqlEngine`]: catalog extraction, row reads and statement execution
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod dialect;
mod engine;
mod reader;

pub use dialect::MysqlDialect;
pub use engine::MysqlEngine;
