//! Human-readable structure log.
//!
//! An append-only text file recording what each extractor found, the DDL that
//! was issued and every recoverable problem. Operators read it after a run to
//! see why a table or index did not make it across.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::schema::SchemaSnapshot;
use crate::error::Result;

const RULE: &str = "==========================================================";

/// Append-only writer for the structure log.
pub struct StructureLog {
    out: Box<dyn Write + Send>,
    path: Option<PathBuf>,
}

impl StructureLog {
    /// Create (truncate) the log file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            out: Box::new(BufWriter::new(file)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Log into an arbitrary writer.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(writer),
            path: None,
        }
    }

    /// Discard everything.
    pub fn sink() -> Self {
        Self::from_writer(std::io::sink())
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write one line.
    pub fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text)?;
        Ok(())
    }

    /// Write a titled section separator.
    pub fn section(&mut self, title: &str) -> Result<()> {
        writeln!(self.out, "\n{}\n{}\n{}\n", RULE, title, RULE)?;
        Ok(())
    }

    /// Record a recoverable problem.
    pub fn warning(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "WARNING : {}", text)?;
        Ok(())
    }

    /// Write the connection header that opens an extractor dump.
    pub fn header(&mut self, pairs: &[(&str, &str)]) -> Result<()> {
        writeln!(self.out)?;
        for (key, value) in pairs {
            writeln!(self.out, "{} = {}", key, value)?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    /// Dump tables, indexes and foreign keys of a snapshot.
    pub fn schema(&mut self, snapshot: &SchemaSnapshot) -> Result<()> {
        writeln!(
            self.out,
            "Parameters are listed in the order : Type, Null Accepted, Primary Key, \
             Auto increment, Default Value\n"
        )?;
        for table in snapshot.tables.values() {
            writeln!(self.out, "{}", table.name)?;
            for col in &table.columns {
                writeln!(
                    self.out,
                    "         {}   => \t{}, {}, {}, {}, {}",
                    col.name,
                    col.data_type,
                    if col.nullable { "YES" } else { "NO" },
                    col.key.as_str(),
                    col.extra,
                    col.default.as_deref().unwrap_or("NULL")
                )?;
            }
            writeln!(self.out)?;
        }

        self.section("Indexes list")?;
        for (table, indexes) in &snapshot.indexes {
            if indexes.is_empty() {
                continue;
            }
            writeln!(self.out, "{}", table)?;
            for idx in indexes.values() {
                writeln!(
                    self.out,
                    "         {}   => \t{:?}, {}, {}",
                    idx.name,
                    idx.columns,
                    u8::from(idx.non_unique()),
                    if idx.nullable { "YES" } else { "" }
                )?;
            }
            writeln!(self.out)?;
        }

        self.section("Foreign Key Constraints")?;
        for (table, fk) in &snapshot.foreign_keys {
            writeln!(self.out, "{}\n{}\n", table, fk.as_str())?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// In-memory log target that stays readable after the log is handed off.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub(crate) fn log(&self) -> StructureLog {
        StructureLog::from_writer(self.clone())
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{
        add_index_column, ForeignKeyClause, NormalizedColumn, NormalizedTable, TableIndexes,
    };

    fn snapshot() -> SchemaSnapshot {
        let mut snapshot = SchemaSnapshot::default();
        let mut id = NormalizedColumn::new("id", "int(11)").primary();
        id.auto_increment = true;
        id.extra = "auto_increment".to_string();
        snapshot.tables.insert(
            "orders".to_string(),
            NormalizedTable::new(
                "orders",
                vec![id, NormalizedColumn::new("note", "text").with_default("n/a")],
            ),
        );
        let mut indexes = TableIndexes::new();
        add_index_column(&mut indexes, "PRIMARY", "id", false, false);
        snapshot.indexes.insert("orders".to_string(), indexes);
        snapshot.foreign_keys.insert(
            "orders".to_string(),
            ForeignKeyClause::new("FOREIGN KEY (`user_id`) REFERENCES `users` (`id`)"),
        );
        snapshot
    }

    #[test]
    fn test_schema_dump_sections() {
        let buffer = SharedBuffer::default();
        let mut log = buffer.log();
        log.header(&[("Host", "db.local"), ("Database", "shop")]).unwrap();
        log.schema(&snapshot()).unwrap();

        let text = buffer.contents();
        assert!(text.contains("Host = db.local\nDatabase = shop\n"));
        assert!(text.contains("         id   => \tint(11), NO, PRI, auto_increment, NULL"));
        assert!(text.contains("         note   => \ttext, YES, , , n/a"));
        assert!(text.contains("Indexes list"));
        assert!(text.contains("         PRIMARY   => \t[\"id\"], 0, "));
        assert!(text.contains("Foreign Key Constraints"));
        assert!(text.contains("orders\nFOREIGN KEY (`user_id`) REFERENCES `users` (`id`)"));
    }

    #[test]
    fn test_file_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("structure.log");
        let mut log = StructureLog::create(&path).unwrap();
        log.warning("Unable to handle table bad").unwrap();
        log.flush().unwrap();

        assert_eq!(log.path(), Some(path.as_path()));
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "WARNING : Unable to handle table bad\n");
    }
}
