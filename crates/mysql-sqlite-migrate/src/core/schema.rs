//! Normalized schema types shared by both engines.
//!
//! Extractors fill these from the live catalogs; the translator and the
//! transfer engine only ever look at these types, never at engine metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of the synthetic index that backs a table's primary key.
pub const PRIMARY_INDEX: &str = "PRIMARY";

/// Role a column plays in the table's keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeyRole {
    #[default]
    None,
    Primary,
    Unique,
    Multiple,
}

impl KeyRole {
    /// Parse the `COLUMN_KEY` value reported by MySQL.
    pub fn from_mysql(key: &str) -> Self {
        match key.trim().to_uppercase().as_str() {
            "PRI" => KeyRole::Primary,
            "UNI" => KeyRole::Unique,
            "MUL" => KeyRole::Multiple,
            _ => KeyRole::None,
        }
    }

    /// Catalog-style abbreviation, used in the structure log.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyRole::None => "",
            KeyRole::Primary => "PRI",
            KeyRole::Unique => "UNI",
            KeyRole::Multiple => "MUL",
        }
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedColumn {
    /// Column name.
    pub name: String,

    /// Declared type exactly as the source catalog reports it (e.g. "int(11) unsigned").
    pub data_type: String,

    /// Whether the column accepts NULL.
    pub nullable: bool,

    /// Key role.
    pub key: KeyRole,

    /// Default value, if any.
    pub default: Option<String>,

    /// Whether the engine generates values for this column.
    pub auto_increment: bool,

    /// Raw extra attributes (e.g. "auto_increment on update CURRENT_TIMESTAMP").
    pub extra: String,
}

impl NormalizedColumn {
    /// Create a nullable, non-key column of the given type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            key: KeyRole::None,
            default: None,
            auto_increment: false,
            extra: String::new(),
        }
    }

    /// Mark the column as part of the primary key (implies NOT NULL).
    pub fn primary(mut self) -> Self {
        self.key = KeyRole::Primary;
        self.nullable = false;
        self
    }

    /// Mark the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn is_primary(&self) -> bool {
        self.key == KeyRole::Primary
    }
}

/// Table metadata. Columns keep catalog declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTable {
    /// Table name.
    pub name: String,

    /// Column definitions.
    pub columns: Vec<NormalizedColumn>,
}

impl NormalizedTable {
    pub fn new(name: impl Into<String>, columns: Vec<NormalizedColumn>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&NormalizedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Primary key column names in declaration order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Check if the table has a single-column primary key.
    pub fn has_single_pk(&self) -> bool {
        self.primary_key().len() == 1
    }
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedIndex {
    /// Index name.
    pub name: String,

    /// Indexed columns in key order.
    pub columns: Vec<String>,

    /// Whether the index enforces uniqueness.
    pub unique: bool,

    /// Whether any indexed column accepts NULL.
    pub nullable: bool,
}

impl NormalizedIndex {
    /// Whether this is the synthetic primary-key index.
    pub fn is_primary(&self) -> bool {
        self.name == PRIMARY_INDEX
    }

    /// Catalog-style `non_unique` flag.
    pub fn non_unique(&self) -> bool {
        !self.unique
    }
}

/// Indexes of one table, by index name.
pub type TableIndexes = BTreeMap<String, NormalizedIndex>;

/// Add one catalog row (one index column) to a table's index map.
///
/// Catalogs report one row per indexed column, so a composite index shows up
/// several times under the same name; its columns are appended in the order
/// the rows arrive.
pub fn add_index_column(
    indexes: &mut TableIndexes,
    index_name: &str,
    column: &str,
    non_unique: bool,
    nullable: bool,
) {
    let index = indexes
        .entry(index_name.to_string())
        .or_insert_with(|| NormalizedIndex {
            name: index_name.to_string(),
            columns: Vec::new(),
            unique: !non_unique,
            nullable: false,
        });
    index.unique = !non_unique;
    index.nullable |= nullable;
    index.columns.push(column.to_string());
}

/// Foreign-key constraint text for one table, copied verbatim between engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyClause(String);

impl ForeignKeyClause {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Scan an engine-rendered `CREATE TABLE` statement for foreign-key clauses.
    ///
    /// Each `FOREIGN KEY` occurrence contributes the text from that keyword to
    /// the end of its clause, including several on one line. Clauses are
    /// joined in source order. Returns `None` when the definition declares no
    /// foreign keys.
    pub fn from_table_definition(definition: &str) -> Option<Self> {
        let mut clauses = Vec::new();
        for line in definition.lines() {
            // ASCII uppercasing keeps byte offsets aligned with `line`
            let upper = line.to_ascii_uppercase();
            let mut offset = 0;
            while let Some(found) = upper[offset..].find("FOREIGN KEY") {
                let start = offset + found;
                let rest = &line[start..];
                let end = clause_end(rest);
                let clause = rest[..end].trim();
                if !clause.is_empty() {
                    clauses.push(clause);
                }
                offset = start + end.max(1);
            }
        }

        if clauses.is_empty() {
            None
        } else {
            Some(Self(clauses.join(",\n")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// End of a table-level clause: a comma at depth 0 or the parenthesis that
/// closes the enclosing `CREATE TABLE (...)`.
fn clause_end(clause: &str) -> usize {
    let mut depth = 0i32;
    let mut in_quote: Option<char> = None;
    for (pos, ch) in clause.char_indices() {
        match in_quote {
            Some(q) if ch == q => in_quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => in_quote = Some(ch),
                '(' => depth += 1,
                ')' if depth == 0 => return pos,
                ')' => depth -= 1,
                ',' if depth == 0 => return pos,
                _ => {}
            },
        }
    }
    clause.len()
}

/// Normalize a catalog default value.
///
/// MariaDB and SQLite report string defaults as quoted SQL literals and a
/// NULL default as the word `NULL`; MySQL reports the bare value. All three
/// are reduced to the bare value, or `None`.
pub fn normalize_default(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("NULL") {
        return None;
    }
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        return Some(trimmed[1..trimmed.len() - 1].replace("''", "'"));
    }
    Some(raw)
}

/// Result of one metadata extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaSnapshot {
    /// Tables by name.
    pub tables: BTreeMap<String, NormalizedTable>,

    /// Indexes by table name, then index name.
    pub indexes: BTreeMap<String, TableIndexes>,

    /// Foreign-key text by table name.
    pub foreign_keys: BTreeMap<String, ForeignKeyClause>,
}

impl SchemaSnapshot {
    pub fn table(&self, name: &str) -> Option<&NormalizedTable> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Keep only the listed tables (and their indexes and foreign keys).
    ///
    /// Returns the requested names that are not present in the schema.
    pub fn retain_tables(&mut self, selected: &[String]) -> Vec<String> {
        self.tables.retain(|name, _| selected.contains(name));
        self.indexes.retain(|name, _| selected.contains(name));
        self.foreign_keys.retain(|name, _| selected.contains(name));
        selected
            .iter()
            .filter(|name| !self.tables.contains_key(*name))
            .cloned()
            .collect()
    }
}
