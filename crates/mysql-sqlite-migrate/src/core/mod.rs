//! Core abstractions shared by both engines.
//!
//! - [`schema`]: normalized table, column, index and foreign-key metadata
//! - [`value`]: SQL values and literal rendering
//! - [`traits`]: the [`Engine`] and [`Dialect`] seams
//! - [`outcome`]: per-table and per-row step results

pub mod outcome;
pub mod schema;
pub mod traits;
pub mod value;

pub use outcome::{BudgetVerdict, RowOutcome, TableCheck};
pub use schema::{
    add_index_column, normalize_default, ForeignKeyClause, KeyRole, NormalizedColumn,
    NormalizedIndex, NormalizedTable, SchemaSnapshot, TableIndexes, PRIMARY_INDEX,
};
pub use traits::{Dialect, Engine};
pub use value::{SqlValue, ValueClass};
