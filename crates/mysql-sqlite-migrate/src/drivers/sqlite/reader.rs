//! SQLite catalog extraction and row decoding.

use std::collections::{BTreeSet, HashMap};

use sqlx::sqlite::{Sqlite, SqliteConnection, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

use crate::core::outcome::TableCheck;
use crate::core::schema::{
    add_index_column, normalize_default, ForeignKeyClause, KeyRole, NormalizedColumn,
    NormalizedTable, SchemaSnapshot, TableIndexes, PRIMARY_INDEX,
};
use crate::core::traits::Dialect;
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};
use crate::structure_log::StructureLog;

use super::SqliteDialect;

const TABLES_QUERY: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name";

const TABLE_SQL_QUERY: &str = "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1";

const COLUMNS_QUERY: &str =
    "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid";

const INDEX_LIST_QUERY: &str = "SELECT name, \"unique\", origin FROM pragma_index_list(?1)";

const INDEX_INFO_QUERY: &str = "SELECT name FROM pragma_index_info(?1) ORDER BY seqno";

/// Extract the schema of the open database, dumping it to `log`.
pub(crate) async fn extract_schema(
    conn: &mut SqliteConnection,
    file: &str,
    log: &mut StructureLog,
) -> Result<SchemaSnapshot> {
    log.header(&[("File", file)])?;

    let mut snapshot = SchemaSnapshot::default();
    for name in list_tables(conn).await? {
        if let TableCheck::Rejected(reason) = check_table(conn, &name).await {
            warn!("Unable to handle table {}: {}", name, reason);
            log.warning(&format!("Unable to handle table {}: {}", name, reason))?;
            continue;
        }

        let definition: Option<String> = sqlx::query_scalar(TABLE_SQL_QUERY)
            .bind(&name)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| MigrateError::extraction(e, "reading SQLite table definition"))?;
        let definition = definition.unwrap_or_default();

        let columns = load_columns(conn, &name, &definition).await?;
        let indexes = load_indexes(conn, &name, &columns, log).await?;
        if let Some(fk) = ForeignKeyClause::from_table_definition(&definition) {
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
        "Extracted {} tables from SQLite database {}",
        snapshot.tables.len(),
        file
    );
    Ok(snapshot)
}

async fn list_tables(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let rows: Vec<SqliteRow> = sqlx::query(TABLES_QUERY)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| MigrateError::extraction(e, "listing SQLite tables"))?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
        .collect()
}

async fn check_table(conn: &mut SqliteConnection, table: &str) -> TableCheck {
    let outcome = TableCheck::check_name(table);
    if !outcome.is_valid() {
        return outcome;
    }
    let sql = format!("SELECT * FROM {} LIMIT 0", SqliteDialect.quote_ident(table));
    match sqlx::raw_sql(&sql).execute(&mut *conn).await {
        Ok(_) => TableCheck::Valid,
        Err(e) => TableCheck::Rejected(e.to_string()),
    }
}

async fn load_columns(
    conn: &mut SqliteConnection,
    table: &str,
    definition: &str,
) -> Result<Vec<NormalizedColumn>> {
    let rows: Vec<SqliteRow> = sqlx::query(COLUMNS_QUERY)
        .bind(table)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| MigrateError::extraction(e, "loading SQLite columns"))?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let pk: i64 = row.try_get("pk")?;
        let notnull: i64 = row.try_get("notnull")?;
        columns.push(NormalizedColumn {
            name: row.try_get("name")?,
            data_type: row.try_get("type")?,
            nullable: notnull == 0 && pk == 0,
            key: if pk > 0 {
                KeyRole::Primary
            } else {
                KeyRole::None
            },
            default: normalize_default(row.try_get("dflt_value")?),
            auto_increment: false,
            extra: String::new(),
        });
    }

    // AUTOINCREMENT is only legal on a sole INTEGER PRIMARY KEY
    let pk_count = columns.iter().filter(|c| c.is_primary()).count();
    if pk_count == 1 && definition.to_uppercase().contains("AUTOINCREMENT") {
        if let Some(col) = columns.iter_mut().find(|c| c.is_primary()) {
            col.auto_increment = true;
            col.extra = "autoincrement".to_string();
        }
    }

    Ok(columns)
}

async fn load_indexes(
    conn: &mut SqliteConnection,
    table: &str,
    columns: &[NormalizedColumn],
    log: &mut StructureLog,
) -> Result<TableIndexes> {
    let list: Vec<SqliteRow> = sqlx::query(INDEX_LIST_QUERY)
        .bind(table)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| MigrateError::extraction(e, "loading SQLite indexes"))?;

    let nullable: HashMap<&str, bool> = columns
        .iter()
        .map(|c| (c.name.as_str(), c.nullable))
        .collect();

    let mut indexes = TableIndexes::new();
    for entry in &list {
        let index_name: String = entry.try_get("name")?;
        let unique: i64 = entry.try_get("unique")?;
        let origin: String = entry.try_get("origin")?;

        let name = match origin.as_str() {
            "pk" => PRIMARY_INDEX.to_string(),
            "c" => index_name.clone(),
            // UNIQUE constraints travel with the table definition
            _ => continue,
        };

        let parts: Vec<Option<String>> = sqlx::query_scalar(INDEX_INFO_QUERY)
            .bind(&index_name)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| MigrateError::extraction(e, "loading SQLite index columns"))?;

        if parts.iter().any(Option::is_none) {
            warn!("Index {}.{} uses an expression and is skipped", table, name);
            log.warning(&format!(
                "Index {}.{} uses an expression and is skipped",
                table, name
            ))?;
            continue;
        }
        for column in parts.into_iter().flatten() {
            let column_nullable = nullable.get(column.as_str()).copied().unwrap_or(true);
            add_index_column(&mut indexes, &name, &column, unique == 0, column_nullable);
        }
    }

    Ok(indexes)
}

/// Decode every column of a row by its storage class.
///
/// Lossy decodes are described in `problems`.
pub(crate) fn decode_row(row: &SqliteRow, problems: &mut BTreeSet<String>) -> Vec<SqlValue> {
    (0..row.len())
        .map(|idx| decode_value(row, idx, problems))
        .collect()
}

fn decode_value(row: &SqliteRow, idx: usize, problems: &mut BTreeSet<String>) -> SqlValue {
    let storage = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return SqlValue::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return SqlValue::Null,
    };
    let column = row.column(idx).name();

    let decoded = match storage.as_str() {
        "INTEGER" => get::<i64>(row, idx).map(SqlValue::Int),
        "REAL" => get::<f64>(row, idx).map(SqlValue::Float),
        "BLOB" => get::<Vec<u8>>(row, idx).map(SqlValue::Bytes),
        _ => get::<String>(row, idx).map(SqlValue::Text).or_else(|| {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx).ok()?;
            problems.insert(format!(
                "column {} holds text that is not valid UTF-8; copied as bytes",
                column
            ));
            Some(SqlValue::Bytes(bytes))
        }),
    };

    decoded.unwrap_or_else(|| {
        problems.insert(format!(
            "could not decode column {} ({}); using NULL",
            column, storage
        ));
        SqlValue::Null
    })
}

fn get<'r, T>(row: &'r SqliteRow, idx: usize) -> Option<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(idx).ok()
}
