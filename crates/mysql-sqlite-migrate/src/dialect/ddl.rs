//! DDL generation for the target engine.

use crate::core::schema::{ForeignKeyClause, NormalizedColumn, NormalizedTable, TableIndexes};
use crate::core::traits::Dialect;

use super::typemap::TypeMapping;

/// SQL-standard temporal defaults, emitted as bare keywords.
const TEMPORAL_KEYWORDS: &[&str] = &["CURRENT_TIMESTAMP", "CURRENT_DATE", "CURRENT_TIME"];

/// Statements generated for one source table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDdl {
    /// `CREATE TABLE IF NOT EXISTS ...`
    pub create_table: String,
    /// One `CREATE [UNIQUE] INDEX` per non-primary index.
    pub create_indexes: Vec<String>,
    /// Type translation warnings, one per unrecognized column type.
    pub warnings: Vec<String>,
}

/// Translate a normalized source table into DDL for `dialect`.
///
/// A single-column primary key is declared inline; a composite one becomes
/// a `pk_<table>` constraint. Foreign-key clauses are appended verbatim.
pub fn translate_table(
    dialect: &dyn Dialect,
    table: &NormalizedTable,
    indexes: Option<&TableIndexes>,
    foreign_keys: Option<&ForeignKeyClause>,
) -> TableDdl {
    let primary_key = table.primary_key();
    let inline_pk = primary_key.len() == 1;

    let mut clauses = Vec::with_capacity(table.columns.len() + 2);
    let mut warnings = Vec::new();

    for column in &table.columns {
        let mapping = dialect.map_column_type(&column.data_type);
        if let Some(warning) = &mapping.warning {
            warnings.push(warning.clone());
        }
        clauses.push(column_clause(dialect, column, &mapping, inline_pk));
    }

    if primary_key.len() > 1 {
        let columns = primary_key
            .iter()
            .map(|c| dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        clauses.push(format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            dialect.quote_ident(&format!("pk_{}", table.name)),
            columns
        ));
    }

    if let Some(fk) = foreign_keys {
        clauses.push(fk.as_str().to_string());
    }

    TableDdl {
        create_table: format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{})",
            dialect.quote_ident(&table.name),
            clauses.join(",\n")
        ),
        create_indexes: indexes
            .map(|idx| create_index_statements(dialect, &table.name, idx))
            .unwrap_or_default(),
        warnings,
    }
}

/// `CREATE INDEX` statements for every index except the primary one.
pub fn create_index_statements(
    dialect: &dyn Dialect,
    table: &str,
    indexes: &TableIndexes,
) -> Vec<String> {
    indexes
        .values()
        .filter(|idx| !idx.is_primary() && !idx.columns.is_empty())
        .map(|idx| dialect.build_create_index(table, idx))
        .collect()
}

fn column_clause(
    dialect: &dyn Dialect,
    column: &NormalizedColumn,
    mapping: &TypeMapping,
    inline_pk: bool,
) -> String {
    let mut clause = format!(
        "{} {} {}",
        dialect.quote_ident(&column.name),
        mapping.target_type,
        if column.nullable { "NULL" } else { "NOT NULL" }
    );
    if inline_pk && column.is_primary() {
        clause.push_str(" PRIMARY KEY");
    }
    if let Some(default) = &column.default {
        clause.push_str(" DEFAULT ");
        clause.push_str(&default_literal(dialect, default, mapping));
    }
    clause
}

/// Render a column default for the target type.
///
/// Temporal keywords stay bare, numbers stay bare on numeric types, and
/// everything else (including the empty string) is quoted.
pub fn default_literal(dialect: &dyn Dialect, default: &str, mapping: &TypeMapping) -> String {
    if let Some(keyword) = temporal_keyword(default) {
        return keyword.to_string();
    }
    if mapping.is_numeric() && is_numeric_literal(default) {
        return default.trim().to_string();
    }
    dialect.quote_text(default)
}

/// Match `CURRENT_TIMESTAMP`, `current_timestamp()`, `CURRENT_TIMESTAMP(6)` and friends.
fn temporal_keyword(default: &str) -> Option<&'static str> {
    let upper = default.trim().to_uppercase();
    let base = match upper.find('(') {
        Some(open) if upper.ends_with(')') => {
            let args = &upper[open + 1..upper.len() - 1];
            if !args.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            &upper[..open]
        }
        Some(_) => return None,
        None => upper.as_str(),
    };
    TEMPORAL_KEYWORDS.iter().copied().find(|k| *k == base)
}

fn is_numeric_literal(value: &str) -> bool {
    let value = value.trim();
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
        && value.parse::<f64>().is_ok()
}
