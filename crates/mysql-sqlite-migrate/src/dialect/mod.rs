//! Schema translation between MySQL and SQLite.
//!
//! - [`typemap`]: ordered column type mapping with lossy-mapping warnings
//! - [`ddl`]: `CREATE TABLE` and `CREATE INDEX` generation
//!
//! DDL is rendered for the target through its [`Dialect`](crate::core::Dialect),
//! which also picks the type mapping for the direction.

pub mod ddl;
pub mod typemap;

pub use ddl::{create_index_statements, default_literal, translate_table, TableDdl};
pub use typemap::{
    mysql_to_sqlite, sqlite_to_mysql, TypeMapping, FALLBACK_TYPE, MYSQL_FALLBACK_TYPE,
};
