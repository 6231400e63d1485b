//! Row transfer engine.
//!
//! Each table is copied with one full scan on the source and one
//! `INSERT ... IGNORE` per row on the target, inside a single transaction per
//! table. Row failures are tolerated up to a run-wide budget.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::outcome::{BudgetVerdict, RowOutcome};
use crate::core::schema::{NormalizedTable, SchemaSnapshot};
use crate::core::traits::Engine;
use crate::error::{MigrateError, Result};
use crate::structure_log::StructureLog;

/// Row failures tolerated per run; the next one aborts.
pub const MAX_ROW_ERRORS: usize = 10;

/// Rows between progress markers.
pub const PROGRESS_INTERVAL: u64 = 100;

/// Run-wide count of failed row inserts.
#[derive(Debug, Clone)]
pub struct ErrorBudget {
    failures: usize,
    limit: usize,
}

impl Default for ErrorBudget {
    fn default() -> Self {
        Self::new(MAX_ROW_ERRORS)
    }
}

impl ErrorBudget {
    pub fn new(limit: usize) -> Self {
        Self { failures: 0, limit }
    }

    /// Count one failure. Exceeding the limit asks the caller to abort.
    pub fn record_failure(&mut self) -> BudgetVerdict {
        self.failures += 1;
        if self.failures > self.limit {
            BudgetVerdict::Abort
        } else {
            BudgetVerdict::Continue
        }
    }

    pub fn failures(&self) -> usize {
        self.failures
    }
}

/// Progress markers, counted across the whole run.
pub struct Progress {
    rows: u64,
    out: Option<Box<dyn Write + Send>>,
}

impl Progress {
    /// Markers go to stderr when `enabled`.
    pub fn new(enabled: bool) -> Self {
        if enabled {
            Self::to_writer(std::io::stderr())
        } else {
            Self { rows: 0, out: None }
        }
    }

    pub fn to_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            rows: 0,
            out: Some(Box::new(out)),
        }
    }

    /// Count one row, writing a `.` every [`PROGRESS_INTERVAL`] rows.
    pub fn tick(&mut self) {
        self.rows += 1;
        if self.rows % PROGRESS_INTERVAL != 0 {
            return;
        }
        if let Some(out) = self.out.as_mut() {
            let _ = write!(out, ".");
            let _ = out.flush();
        }
    }

    /// Rows counted so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// End the marker line if any marker was written.
    pub fn finish(&mut self) {
        if self.rows < PROGRESS_INTERVAL {
            return;
        }
        if let Some(out) = self.out.as_mut() {
            let _ = writeln!(out);
            let _ = out.flush();
        }
    }
}

/// What to copy for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TablePlan {
    /// Copy these columns, in source order.
    Copy {
        table: String,
        columns: Vec<String>,
        /// Source columns missing on the target.
        dropped: Vec<String>,
    },
    /// The table is missing on the target.
    Skip { table: String },
}

/// Reconcile a source table against the target schema.
///
/// Builds a fresh column list instead of editing the source one.
pub fn plan_table(source: &NormalizedTable, target: &SchemaSnapshot) -> TablePlan {
    let Some(target_table) = target.table(&source.name) else {
        return TablePlan::Skip {
            table: source.name.clone(),
        };
    };

    let (columns, dropped): (Vec<String>, Vec<String>) = source
        .column_names()
        .into_iter()
        .partition(|name| target_table.has_column(name));

    TablePlan::Copy {
        table: source.name.clone(),
        columns,
        dropped,
    }
}

/// Per-table transfer statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    pub table: String,
    pub rows_read: u64,
    pub inserted: u64,
    pub ignored: u64,
    pub failed: u64,
}

/// Copy every row of `table` from `source` to `target`.
///
/// Returns `ErrorThresholdExceeded` once `budget` runs out; the open
/// transaction is rolled back first.
pub async fn transfer_table(
    source: &mut dyn Engine,
    target: &mut dyn Engine,
    table: &str,
    columns: &[String],
    budget: &mut ErrorBudget,
    progress: &mut Progress,
    log: &mut StructureLog,
) -> Result<TransferStats> {
    let mut stats = TransferStats {
        table: table.to_string(),
        ..Default::default()
    };

    if columns.is_empty() {
        warn!("{}: no common columns, skipping", table);
        log.warning(&format!("Table {} has no common columns; skipped", table))?;
        return Ok(stats);
    }

    let rows = source.fetch_rows(table, columns, log).await?;
    stats.rows_read = rows.len() as u64;
    if rows.is_empty() {
        debug!("{}: no rows", table);
        return Ok(stats);
    }
    info!("{}: {} rows", table, rows.len());

    target.begin().await?;
    for row in &rows {
        let statement = target.dialect().build_insert(table, columns, row);
        let result = target
            .execute(&statement)
            .await
            .map_err(|e| e.to_string());

        match RowOutcome::from_affected(result, statement) {
            RowOutcome::Inserted => stats.inserted += 1,
            RowOutcome::Ignored => stats.ignored += 1,
            RowOutcome::Failed { statement, error } => {
                stats.failed += 1;
                warn!("Insert failed: {}\n  {}", statement, error);
                log.warning(&format!("Insert failed: {}\n  {}", statement, error))?;

                if budget.record_failure() == BudgetVerdict::Abort {
                    if let Err(e) = target.rollback().await {
                        warn!("Rollback of {} failed: {}", table, e);
                    }
                    return Err(MigrateError::ErrorThresholdExceeded {
                        count: budget.failures(),
                    });
                }
            }
        }
        progress.tick();
    }
    target.commit().await?;

    debug!(
        "{}: {} inserted, {} ignored, {} failed",
        table, stats.inserted, stats.ignored, stats.failed
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::NormalizedColumn;
    use crate::core::value::SqlValue;
    use crate::drivers::memory::MemoryEngine;
    use crate::structure_log::SharedBuffer;

    fn users_schema() -> SchemaSnapshot {
        let mut schema = SchemaSnapshot::default();
        schema.tables.insert(
            "users".to_string(),
            NormalizedTable::new(
                "users",
                vec![
                    NormalizedColumn::new("id", "int(11)").primary(),
                    NormalizedColumn::new("name", "varchar(50)"),
                    NormalizedColumn::new("bio", "text"),
                ],
            ),
        );
        schema
    }

    fn user_rows(n: i64) -> Vec<Vec<SqlValue>> {
        (1..=n)
            .map(|i| vec![SqlValue::Int(i), SqlValue::from(format!("u{}", i)), SqlValue::Null])
            .collect()
    }

    fn columns() -> Vec<String> {
        vec!["id".to_string(), "name".to_string(), "bio".to_string()]
    }

    #[test]
    fn test_error_budget_allows_ten() {
        let mut budget = ErrorBudget::default();
        for _ in 0..MAX_ROW_ERRORS {
            assert_eq!(budget.record_failure(), BudgetVerdict::Continue);
        }
        assert_eq!(budget.record_failure(), BudgetVerdict::Abort);
        assert_eq!(budget.failures(), 11);
    }

    #[test]
    fn test_progress_counts_across_calls() {
        let mut progress = Progress::new(false);
        for _ in 0..250 {
            progress.tick();
        }
        assert_eq!(progress.rows(), 250);
    }

    #[test]
    fn test_progress_marks_every_hundred_rows() {
        let buffer = SharedBuffer::default();
        let mut progress = Progress::to_writer(buffer.clone());
        for _ in 0..99 {
            progress.tick();
        }
        assert_eq!(buffer.contents(), "");

        for _ in 0..151 {
            progress.tick();
        }
        assert_eq!(buffer.contents(), "..");

        progress.finish();
        assert_eq!(buffer.contents(), "..\n");
    }

    #[test]
    fn test_progress_finish_is_silent_below_interval() {
        let buffer = SharedBuffer::default();
        let mut progress = Progress::to_writer(buffer.clone());
        for _ in 0..99 {
            progress.tick();
        }
        progress.finish();
        assert_eq!(buffer.contents(), "");
    }

    #[test]
    fn test_plan_drops_missing_columns_and_tables() {
        let source = NormalizedTable::new(
            "users",
            vec![
                NormalizedColumn::new("id", "integer").primary(),
                NormalizedColumn::new("legacy", "text"),
                NormalizedColumn::new("name", "text"),
            ],
        );
        assert_eq!(
            plan_table(&source, &users_schema()),
            TablePlan::Copy {
                table: "users".to_string(),
                columns: vec!["id".to_string(), "name".to_string()],
                dropped: vec!["legacy".to_string()],
            }
        );

        let other = NormalizedTable::new("ghost", vec![]);
        assert_eq!(
            plan_table(&other, &users_schema()),
            TablePlan::Skip {
                table: "ghost".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_transfer_commits_once_per_table() {
        let mut source = MemoryEngine::new(users_schema()).with_rows("users", user_rows(3));
        let mut target = MemoryEngine::new(users_schema());
        let journal = target.journal();
        let mut budget = ErrorBudget::default();
        let mut progress = Progress::new(false);
        let mut log = StructureLog::sink();

        let stats = transfer_table(
            &mut source,
            &mut target,
            "users",
            &columns(),
            &mut budget,
            &mut progress,
            &mut log,
        )
        .await
        .unwrap();

        assert_eq!(stats.rows_read, 3);
        assert_eq!(stats.inserted, 3);
        let statements = journal.statements();
        assert_eq!(statements.first().map(String::as_str), Some("START TRANSACTION"));
        assert_eq!(statements.last().map(String::as_str), Some("COMMIT"));
        assert_eq!(journal.matching("COMMIT").len(), 1);
        assert_eq!(
            statements[1],
            "INSERT IGNORE INTO `users` (`id`, `name`, `bio`) VALUES(1, 'u1', NULL)"
        );
    }

    #[tokio::test]
    async fn test_progress_spans_tables() {
        let mut source = MemoryEngine::new(users_schema()).with_rows("users", user_rows(150));
        let mut target = MemoryEngine::new(users_schema());
        let buffer = SharedBuffer::default();
        let mut progress = Progress::to_writer(buffer.clone());
        let mut budget = ErrorBudget::default();
        let mut log = StructureLog::sink();

        for _ in 0..2 {
            transfer_table(
                &mut source,
                &mut target,
                "users",
                &columns(),
                &mut budget,
                &mut progress,
                &mut log,
            )
            .await
            .unwrap();
        }

        assert_eq!(progress.rows(), 300);
        assert_eq!(buffer.contents(), "...");
    }

    #[tokio::test]
    async fn test_empty_table_is_skipped() {
        let mut source = MemoryEngine::new(users_schema());
        let mut target = MemoryEngine::new(users_schema());
        let journal = target.journal();

        let stats = transfer_table(
            &mut source,
            &mut target,
            "users",
            &columns(),
            &mut ErrorBudget::default(),
            &mut Progress::new(false),
            &mut StructureLog::sink(),
        )
        .await
        .unwrap();

        assert_eq!(stats.rows_read, 0);
        assert!(journal.statements().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_logged_and_counted() {
        let mut source = MemoryEngine::new(users_schema()).with_rows("users", user_rows(5));
        let mut target =
            MemoryEngine::new(users_schema()).failing_when(|sql| sql.contains("'u2'"));
        let buffer = SharedBuffer::default();
        let mut log = buffer.log();
        let mut budget = ErrorBudget::default();

        let stats = transfer_table(
            &mut source,
            &mut target,
            "users",
            &columns(),
            &mut budget,
            &mut Progress::new(false),
            &mut log,
        )
        .await
        .unwrap();

        assert_eq!(stats.inserted, 4);
        assert_eq!(stats.failed, 1);
        assert_eq!(budget.failures(), 1);
        assert!(buffer.contents().contains("VALUES(2, 'u2', NULL)"));
    }

    #[tokio::test]
    async fn test_eleventh_failure_aborts_and_rolls_back() {
        let mut source = MemoryEngine::new(users_schema()).with_rows("users", user_rows(20));
        let mut target =
            MemoryEngine::new(users_schema()).failing_when(|sql| sql.starts_with("INSERT"));
        let journal = target.journal();
        let mut budget = ErrorBudget::default();

        let err = transfer_table(
            &mut source,
            &mut target,
            "users",
            &columns(),
            &mut budget,
            &mut Progress::new(false),
            &mut StructureLog::sink(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MigrateError::ErrorThresholdExceeded { count: 11 }));
        assert_eq!(journal.matching("INSERT").len(), 11);
        assert_eq!(journal.statements().last().map(String::as_str), Some("ROLLBACK"));
        assert!(journal.matching("COMMIT").is_empty());
    }
}
