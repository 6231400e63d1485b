//! MySQL/MariaDB catalog extraction and row decoding.
//!
//! Catalog queries CAST string columns to CHAR to handle collation
//! differences where information_schema may return VARBINARY instead of
//! VARCHAR. Row scans go through the text protocol so temporal and exotic
//! values arrive in MySQL's own rendering.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use sqlx::mysql::{MySql, MySqlConnection, MySqlRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

use crate::core::outcome::TableCheck;
use crate::core::schema::{
    add_index_column, normalize_default, ForeignKeyClause, KeyRole, NormalizedColumn,
    NormalizedTable, SchemaSnapshot, TableIndexes,
};
use crate::core::traits::Dialect;
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};
use crate::structure_log::StructureLog;

use super::MysqlDialect;

const TABLES_QUERY: &str = r#"
    SELECT CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME
    FROM INFORMATION_SCHEMA.TABLES
    WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
    ORDER BY TABLE_NAME
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
        CAST(COLUMN_TYPE AS CHAR) AS COLUMN_TYPE,
        CAST(IS_NULLABLE AS CHAR(3)) AS IS_NULLABLE,
        CAST(COLUMN_KEY AS CHAR(3)) AS COLUMN_KEY,
        CAST(COLUMN_DEFAULT AS CHAR) AS COLUMN_DEFAULT,
        CAST(EXTRA AS CHAR(255)) AS EXTRA
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
"#;

const INDEXES_QUERY: &str = r#"
    SELECT
        CAST(INDEX_NAME AS CHAR(255)) AS INDEX_NAME,
        CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
        CAST(NON_UNIQUE AS SIGNED) AS NON_UNIQUE,
        CAST(NULLABLE AS CHAR(3)) AS NULLABLE
    FROM INFORMATION_SCHEMA.STATISTICS
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
    ORDER BY INDEX_NAME, SEQ_IN_INDEX
"#;

/// Extract the schema of `database`, dumping it to `log`.
pub(crate) async fn extract_schema(
    conn: &mut MySqlConnection,
    host: &str,
    database: &str,
    log: &mut StructureLog,
) -> Result<SchemaSnapshot> {
    log.header(&[("Host", host), ("Database", database)])?;

    let mut snapshot = SchemaSnapshot::default();
    for name in list_tables(conn, database).await? {
        if let TableCheck::Rejected(reason) = check_table(conn, &name).await {
            warn!("Unable to handle table {}: {}", name, reason);
            log.warning(&format!("Unable to handle table {}: {}", name, reason))?;
            continue;
        }

        let columns = load_columns(conn, database, &name).await?;
        let indexes = load_indexes(conn, database, &name, log).await?;
        if let Some(fk) = load_foreign_keys(conn, &name).await? {
            snapshot.foreign_keys.insert(name.clone(), fk);
        }
        debug!(
            "Loaded {} columns and {} indexes for {}",
            columns.len(),
            indexes.len(),
            name
        );

        snapshot.indexes.insert(name.clone(), indexes);
        snapshot
            .tables
            .insert(name.clone(), NormalizedTable::new(name, columns));
    }

    log.schema(&snapshot)?;
    info!(
        "Extracted {} tables from MySQL database '{}'",
        snapshot.tables.len(),
        database
    );
    Ok(snapshot)
}

async fn list_tables(conn: &mut MySqlConnection, database: &str) -> Result<Vec<String>> {
    let rows: Vec<MySqlRow> = sqlx::query(TABLES_QUERY)
        .bind(database)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| MigrateError::extraction(e, "listing MySQL tables"))?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("TABLE_NAME").map_err(Into::into))
        .collect()
}

/// Run a harmless statement against the table to make sure it can be read.
async fn check_table(conn: &mut MySqlConnection, table: &str) -> TableCheck {
    let outcome = TableCheck::check_name(table);
    if !outcome.is_valid() {
        return outcome;
    }
    let sql = format!("SHOW COLUMNS FROM {}", MysqlDialect.quote_ident(table));
    match sqlx::raw_sql(&sql).fetch_all(&mut *conn).await {
        Ok(_) => TableCheck::Valid,
        Err(e) => TableCheck::Rejected(e.to_string()),
    }
}

async fn load_columns(
    conn: &mut MySqlConnection,
    database: &str,
    table: &str,
) -> Result<Vec<NormalizedColumn>> {
    let rows: Vec<MySqlRow> = sqlx::query(COLUMNS_QUERY)
        .bind(database)
        .bind(table)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| MigrateError::extraction(e, "loading MySQL columns"))?;

    rows.iter().map(column_from_row).collect()
}

fn column_from_row(row: &MySqlRow) -> Result<NormalizedColumn> {
    let extra: String = row.try_get::<Option<String>, _>("EXTRA")?.unwrap_or_default();
    let key: Option<String> = row.try_get("COLUMN_KEY")?;
    let nullable: String = row.try_get("IS_NULLABLE")?;

    Ok(NormalizedColumn {
        name: row.try_get("COLUMN_NAME")?,
        data_type: row.try_get("COLUMN_TYPE")?,
        nullable: nullable.eq_ignore_ascii_case("YES"),
        key: KeyRole::from_mysql(key.as_deref().unwrap_or_default()),
        default: normalize_default(row.try_get("COLUMN_DEFAULT")?),
        auto_increment: extra.to_lowercase().contains("auto_increment"),
        extra,
    })
}

async fn load_indexes(
    conn: &mut MySqlConnection,
    database: &str,
    table: &str,
    log: &mut StructureLog,
) -> Result<TableIndexes> {
    let rows: Vec<MySqlRow> = sqlx::query(INDEXES_QUERY)
        .bind(database)
        .bind(table)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| MigrateError::extraction(e, "loading MySQL indexes"))?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in &rows {
        let nullable: Option<String> = row.try_get("NULLABLE")?;
        entries.push(IndexEntry {
            index: row.try_get("INDEX_NAME")?,
            column: row.try_get("COLUMN_NAME")?,
            non_unique: row.try_get::<i64, _>("NON_UNIQUE")? != 0,
            nullable: nullable.as_deref() == Some("YES"),
        });
    }

    let (indexes, skipped) = group_index_entries(entries);
    for name in skipped {
        warn!("Index {}.{} uses an expression and is skipped", table, name);
        log.warning(&format!(
            "Index {}.{} uses an expression and is skipped",
            table, name
        ))?;
    }

    Ok(indexes)
}

/// One `INFORMATION_SCHEMA.STATISTICS` row.
struct IndexEntry {
    index: String,
    /// `None` for functional key parts.
    column: Option<String>,
    non_unique: bool,
    nullable: bool,
}

/// Group rows (ordered by index, then position) into indexes.
///
/// Returns the indexes plus the names of expression indexes, which are
/// dropped whole.
fn group_index_entries(entries: Vec<IndexEntry>) -> (TableIndexes, Vec<String>) {
    let mut indexes = TableIndexes::new();
    let mut expression_indexes = BTreeSet::new();

    for entry in entries {
        match entry.column {
            Some(column) => add_index_column(
                &mut indexes,
                &entry.index,
                &column,
                entry.non_unique,
                entry.nullable,
            ),
            None => {
                expression_indexes.insert(entry.index);
            }
        }
    }

    for name in &expression_indexes {
        indexes.remove(name);
    }
    (indexes, expression_indexes.into_iter().collect())
}

async fn load_foreign_keys(
    conn: &mut MySqlConnection,
    table: &str,
) -> Result<Option<ForeignKeyClause>> {
    let sql = format!("SHOW CREATE TABLE {}", MysqlDialect.quote_ident(table));
    let row = sqlx::raw_sql(&sql)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| MigrateError::extraction(e, "reading MySQL table definition"))?;

    let definition = match row.try_get::<String, _>(1) {
        Ok(text) => text,
        Err(_) => String::from_utf8_lossy(&row.try_get_unchecked::<Vec<u8>, _>(1)?).into_owned(),
    };

    Ok(ForeignKeyClause::from_table_definition(&definition))
}

/// How a column is read back, by its reported type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeKind {
    Signed,
    Unsigned,
    Float,
    Decimal,
    Bytes,
    /// MySQL's own text rendering.
    Text,
}

fn decode_kind(type_name: &str) -> DecodeKind {
    match type_name {
        // sqlx names TINYINT(1) "BOOLEAN", but the column holds any tinyint
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => DecodeKind::Signed,
        t if t.ends_with(" UNSIGNED") => DecodeKind::Unsigned,
        "FLOAT" | "DOUBLE" => DecodeKind::Float,
        "DECIMAL" => DecodeKind::Decimal,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "GEOMETRY"
        | "BIT" => DecodeKind::Bytes,
        _ => DecodeKind::Text,
    }
}

/// Decode every column of a row.
///
/// Columns that decode to nothing become NULL and are described in
/// `problems`.
pub(crate) fn decode_row(row: &MySqlRow, problems: &mut BTreeSet<String>) -> Vec<SqlValue> {
    (0..row.len())
        .map(|idx| decode_value(row, idx, problems))
        .collect()
}

fn decode_value(row: &MySqlRow, idx: usize, problems: &mut BTreeSet<String>) -> SqlValue {
    let type_name = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return SqlValue::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return SqlValue::Null,
    };

    let decoded = match decode_kind(&type_name) {
        DecodeKind::Signed => get::<i64>(row, idx).map(SqlValue::Int),
        DecodeKind::Unsigned => get::<u64>(row, idx).map(SqlValue::UInt),
        DecodeKind::Float => get::<f64>(row, idx).map(SqlValue::Float),
        DecodeKind::Decimal => get::<Decimal>(row, idx).map(SqlValue::Decimal),
        DecodeKind::Bytes => get::<Vec<u8>>(row, idx).map(SqlValue::Bytes),
        DecodeKind::Text => None,
    };

    decoded
        .or_else(|| text_value(row, idx))
        .unwrap_or_else(|| {
            problems.insert(format!(
                "could not decode column {} ({}); using NULL",
                row.column(idx).name(),
                type_name
            ));
            SqlValue::Null
        })
}

fn get<'r, T>(row: &'r MySqlRow, idx: usize) -> Option<T>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get(idx).ok()
}

/// MySQL's own text rendering of the value (dates, times, enums, JSON...).
fn text_value(row: &MySqlRow, idx: usize) -> Option<SqlValue> {
    let bytes: Vec<u8> = row.try_get_unchecked(idx).ok()?;
    Some(match String::from_utf8(bytes) {
        Ok(text) => SqlValue::Text(text),
        Err(e) => SqlValue::Bytes(e.into_bytes()),
    })
}
