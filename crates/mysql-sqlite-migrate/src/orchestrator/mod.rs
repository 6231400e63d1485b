//! Migration orchestrator - main workflow coordinator.
//!
//! One run goes through five phases in order: extract the source schema,
//! create the target tables, extract the target schema, copy the rows and
//! create the indexes.
//!
//! Going to SQLite the file is always new, so every table is created. Going
//! to MySQL the target is inspected first: missing tables are created,
//! present ones are kept (and optionally truncated), all with foreign-key
//! checks off.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Config, Direction};
use crate::core::schema::SchemaSnapshot;
use crate::core::traits::Engine;
use crate::dialect::{create_index_statements, translate_table};
use crate::drivers::{MysqlEngine, SqliteEngine};
use crate::error::{MigrateError, Result};
use crate::structure_log::StructureLog;
use crate::transfer::{plan_table, transfer_table, ErrorBudget, Progress, TablePlan, TransferStats};

/// Asks the operator before destructive steps.
pub trait ConfirmationGate: Send {
    /// Confirm truncating `tables` on `target` before loading.
    fn confirm_truncate(&mut self, target: &str, tables: &[String]) -> Result<bool>;
}

impl<G: ConfirmationGate + ?Sized> ConfirmationGate for Box<G> {
    fn confirm_truncate(&mut self, target: &str, tables: &[String]) -> Result<bool> {
        (**self).confirm_truncate(target, tables)
    }
}

/// Gate that approves everything (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl ConfirmationGate for AssumeYes {
    fn confirm_truncate(&mut self, _target: &str, _tables: &[String]) -> Result<bool> {
        Ok(true)
    }
}

/// Gate that declines everything. Used when no operator is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDecline;

impl ConfirmationGate for AlwaysDecline {
    fn confirm_truncate(&mut self, _target: &str, _tables: &[String]) -> Result<bool> {
        Ok(false)
    }
}

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    direction: Direction,
    source: Box<dyn Engine>,
    target: Box<dyn Engine>,
    log: StructureLog,
    gate: Box<dyn ConfirmationGate>,
    progress: bool,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Run direction, e.g. "mysql -> sqlite".
    pub direction: String,

    /// Final status.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Tables selected for migration.
    pub tables_total: usize,

    /// Tables created on the target.
    pub tables_created: usize,

    /// Tables whose rows were copied.
    pub tables_transferred: usize,

    /// Tables missing on the target.
    pub skipped_tables: Vec<String>,

    /// Tables whose CREATE TABLE failed.
    pub failed_tables: Vec<String>,

    /// Rows read from the source.
    pub rows_read: u64,

    /// Rows written to the target.
    pub rows_inserted: u64,

    /// Rows skipped as duplicates.
    pub rows_ignored: u64,

    /// Rows that failed to insert.
    pub row_errors: u64,

    /// Indexes created on the target.
    pub indexes_created: usize,

    /// Index statements that failed.
    pub index_failures: usize,

    /// Column types that fell back to the default type.
    pub type_warnings: usize,

    /// Structure log location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Per-table statistics.
    pub tables: Vec<TransferStats>,
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Result of a connectivity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub mysql_connected: bool,
    pub mysql_latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mysql_error: Option<String>,
    pub sqlite_ok: bool,
    pub sqlite_latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlite_error: Option<String>,
    pub healthy: bool,
}

/// Counters accumulated across phases.
#[derive(Debug, Default)]
struct RunSummary {
    tables_total: usize,
    created_tables: BTreeSet<String>,
    failed_tables: Vec<String>,
    skipped_tables: Vec<String>,
    type_warnings: usize,
    stats: Vec<TransferStats>,
    indexes_created: usize,
    index_failures: usize,
}

/// Refuse to touch an existing SQLite target unless overwriting is allowed.
pub fn check_sqlite_target(path: &Path, delete_existing: bool) -> Result<()> {
    if path.exists() && !delete_existing {
        return Err(MigrateError::TargetExists {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

impl Orchestrator {
    /// Connect both engines for the configured direction.
    ///
    /// For MySQL → SQLite the target file guard runs before anything is
    /// opened or created.
    pub async fn new(config: Config) -> Result<Self> {
        let direction = config.options.direction();
        let sqlite_path = config.sqlite.file.clone();

        match direction {
            Direction::MysqlToSqlite => {
                check_sqlite_target(&sqlite_path, config.options.delete_existing_data)?
            }
            Direction::SqliteToMysql => {
                if !sqlite_path.exists() {
                    return Err(MigrateError::Config(format!(
                        "SQLite source {} does not exist",
                        sqlite_path.display()
                    )));
                }
            }
        }

        let mysql: Box<dyn Engine> = Box::new(MysqlEngine::connect(&config.mysql).await?);

        if direction == Direction::MysqlToSqlite && sqlite_path.exists() {
            std::fs::remove_file(&sqlite_path)?;
            info!("Deleted existing SQLite file {}", sqlite_path.display());
        }
        let sqlite: Box<dyn Engine> = Box::new(
            SqliteEngine::open(&sqlite_path, direction == Direction::MysqlToSqlite).await?,
        );

        let log_path = config.options.log_path();
        let log = StructureLog::create(&log_path)?;
        info!("Writing structure log to {}", log_path.display());

        let (source, target) = match direction {
            Direction::MysqlToSqlite => (mysql, sqlite),
            Direction::SqliteToMysql => (sqlite, mysql),
        };
        Ok(Self::with_engines(config, source, target, log))
    }

    /// Build an orchestrator over already-open engines.
    pub fn with_engines(
        config: Config,
        source: Box<dyn Engine>,
        target: Box<dyn Engine>,
        log: StructureLog,
    ) -> Self {
        Self {
            direction: config.options.direction(),
            config,
            source,
            target,
            log,
            gate: Box::new(AlwaysDecline),
            progress: false,
        }
    }

    /// Set the gate consulted before truncating target tables.
    pub fn with_confirmation(mut self, gate: impl ConfirmationGate + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    /// Print progress markers to stderr.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    /// Run the migration.
    pub async fn run(mut self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let timer = Instant::now();
        info!(
            "Starting migration ({}): {} -> {}",
            self.direction,
            self.source.describe(),
            self.target.describe()
        );

        let outcome = self.run_phases().await;

        let Orchestrator {
            direction,
            source,
            target,
            mut log,
            ..
        } = self;
        if let Err(e) = log.flush() {
            warn!("Failed to flush structure log: {}", e);
        }
        let log_file = log.path().map(Path::to_path_buf);
        for engine in [source, target] {
            let name = engine.describe();
            if let Err(e) = engine.close().await {
                warn!("Failed to close {}: {}", name, e);
            }
        }

        let summary = outcome?;
        let completed_at = Utc::now();

        let result = MigrationResult {
            direction: direction.to_string(),
            status: "completed".to_string(),
            duration_seconds: timer.elapsed().as_secs_f64(),
            started_at,
            completed_at,
            tables_total: summary.tables_total,
            tables_created: summary.created_tables.len(),
            tables_transferred: summary.stats.len(),
            skipped_tables: summary.skipped_tables,
            failed_tables: summary.failed_tables,
            rows_read: summary.stats.iter().map(|s| s.rows_read).sum(),
            rows_inserted: summary.stats.iter().map(|s| s.inserted).sum(),
            rows_ignored: summary.stats.iter().map(|s| s.ignored).sum(),
            row_errors: summary.stats.iter().map(|s| s.failed).sum(),
            indexes_created: summary.indexes_created,
            index_failures: summary.index_failures,
            type_warnings: summary.type_warnings,
            log_file,
            tables: summary.stats,
        };

        info!(
            "Migration completed in {:.2}s: {} tables, {} rows inserted, {} ignored, {} failed",
            result.duration_seconds,
            result.tables_transferred,
            result.rows_inserted,
            result.rows_ignored,
            result.row_errors
        );
        Ok(result)
    }

    async fn run_phases(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        // Phase 1: Extract source schema
        info!("Phase 1: Extracting schema from {}", self.source.describe());
        let mut schema = self.source.extract_schema(&mut self.log).await?;
        self.apply_filter(&mut schema)?;
        summary.tables_total = schema.tables.len();
        info!("Found {} tables to migrate", summary.tables_total);

        let target_schema = match self.direction {
            Direction::MysqlToSqlite => {
                // Phase 2: Create target tables
                info!("Phase 2: Creating tables in {}", self.target.describe());
                self.create_tables(&schema, &mut summary).await?;

                // Phase 3: Extract target schema
                info!("Phase 3: Extracting schema from {}", self.target.describe());
                let target_schema = self.target.extract_schema(&mut self.log).await?;

                // Phase 4: Transfer rows
                info!("Phase 4: Transferring data");
                self.transfer_rows(&schema, &target_schema, &mut summary)
                    .await?;
                target_schema
            }
            // Phases 2 to 4 run under one foreign-key switch
            Direction::SqliteToMysql => self.load_mysql(&schema, &mut summary).await?,
        };

        // Phase 5: Indexes
        info!("Phase 5: Creating indexes");
        self.create_indexes(&schema, &target_schema, &mut summary)
            .await?;

        Ok(summary)
    }

    /// Keep only the configured tables.
    fn apply_filter(&mut self, schema: &mut SchemaSnapshot) -> Result<()> {
        let selected = self.config.options.selected_tables();
        if selected.is_empty() {
            return Ok(());
        }

        for missing in schema.retain_tables(&selected) {
            warn!("Table {} not found in {}", missing, self.source.describe());
            self.log
                .warning(&format!("Selected table {} not found in source", missing))?;
        }
        debug!("Table filter: {:?}", selected);
        Ok(())
    }

    async fn create_tables(
        &mut self,
        schema: &SchemaSnapshot,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let title = match self.direction {
            Direction::MysqlToSqlite => "Sqlite database creation",
            Direction::SqliteToMysql => "MySQL database creation",
        };
        self.log.section(title)?;
        let mut type_errors = Vec::new();

        for table in schema.tables.values() {
            let ddl = translate_table(
                self.target.dialect(),
                table,
                None,
                schema.foreign_keys.get(&table.name),
            );
            self.log.line(&ddl.create_table)?;
            self.log.line("")?;
            for warning in ddl.warnings {
                warn!("{}: {}", table.name, warning);
                type_errors.push(format!("{}: {}", table.name, warning));
            }

            match self.target.execute(&ddl.create_table).await {
                Ok(_) => {
                    debug!("Created table {}", table.name);
                    summary.created_tables.insert(table.name.clone());
                }
                Err(e) => {
                    warn!("Error creating table {}: {}", table.name, e);
                    self.log
                        .warning(&format!("Error : {}\n  {}", ddl.create_table, e))?;
                    summary.failed_tables.push(table.name.clone());
                }
            }
        }

        summary.type_warnings += type_errors.len();
        if !type_errors.is_empty() {
            self.log.section("Type errors")?;
            for line in &type_errors {
                self.log.line(line)?;
            }
        }
        Ok(())
    }

    /// Create missing MySQL tables and load rows into all of them.
    ///
    /// Foreign-key checks are off from the first change to the last row and
    /// are switched back on even when the load fails. Returns the target
    /// schema the rows were loaded against.
    async fn load_mysql(
        &mut self,
        schema: &SchemaSnapshot,
        summary: &mut RunSummary,
    ) -> Result<SchemaSnapshot> {
        // Phase 2: Extract target schema
        info!("Phase 2: Extracting schema from {}", self.target.describe());
        let existing = self.target.extract_schema(&mut self.log).await?;

        let present: Vec<String> = schema
            .tables
            .keys()
            .filter(|name| existing.tables.contains_key(*name))
            .cloned()
            .collect();

        let truncate = self.config.options.delete_existing_data && !present.is_empty();
        if truncate && !self.gate.confirm_truncate(&self.target.describe(), &present)? {
            warn!("Truncation declined; nothing was changed");
            return Err(MigrateError::Aborted);
        }

        let fk_off = self.target.dialect().foreign_key_checks(false);
        self.target.execute(&fk_off).await?;

        let result = self
            .prepare_and_transfer(schema, existing, &present, truncate, summary)
            .await;

        let fk_on = self.target.dialect().foreign_key_checks(true);
        match self.target.execute(&fk_on).await {
            Ok(_) => result,
            Err(e) => {
                warn!("Failed to re-enable foreign key checks: {}", e);
                result.and(Err(e))
            }
        }
    }

    async fn prepare_and_transfer(
        &mut self,
        schema: &SchemaSnapshot,
        existing: SchemaSnapshot,
        present: &[String],
        truncate: bool,
        summary: &mut RunSummary,
    ) -> Result<SchemaSnapshot> {
        if truncate {
            self.truncate_tables(present).await?;
        }

        // Phase 3: Create missing tables
        let mut missing = schema.clone();
        missing
            .tables
            .retain(|name, _| !existing.tables.contains_key(name));
        let target_schema = if missing.tables.is_empty() {
            existing
        } else {
            info!(
                "Phase 3: Creating {} tables in {}",
                missing.tables.len(),
                self.target.describe()
            );
            self.create_tables(&missing, summary).await?;
            self.target.extract_schema(&mut self.log).await?
        };

        // Phase 4: Transfer rows
        info!("Phase 4: Transferring data");
        self.transfer_rows(schema, &target_schema, summary).await?;
        Ok(target_schema)
    }

    async fn truncate_tables(&mut self, tables: &[String]) -> Result<()> {
        for table in tables {
            let sql = self.target.dialect().build_truncate(table);
            info!("{}", sql);
            self.target.execute(&sql).await?;
        }
        Ok(())
    }

    async fn transfer_rows(
        &mut self,
        schema: &SchemaSnapshot,
        target_schema: &SchemaSnapshot,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let mut budget = ErrorBudget::default();
        let mut progress = Progress::new(self.progress);

        let result = self
            .transfer_each(schema, target_schema, summary, &mut budget, &mut progress)
            .await;
        progress.finish();
        result
    }

    async fn transfer_each(
        &mut self,
        schema: &SchemaSnapshot,
        target_schema: &SchemaSnapshot,
        summary: &mut RunSummary,
        budget: &mut ErrorBudget,
        progress: &mut Progress,
    ) -> Result<()> {
        for table in schema.tables.values() {
            let (name, columns) = match plan_table(table, target_schema) {
                TablePlan::Skip { table } => {
                    warn!("Table {} does not exist in the target; skipped", table);
                    self.log
                        .warning(&format!("Table {} does not exist in the target", table))?;
                    summary.skipped_tables.push(table);
                    continue;
                }
                TablePlan::Copy {
                    table,
                    columns,
                    dropped,
                } => {
                    for column in &dropped {
                        warn!("Column {}.{} does not exist in the target; skipped", table, column);
                        self.log.warning(&format!(
                            "Column {}.{} does not exist in the target",
                            table, column
                        ))?;
                    }
                    (table, columns)
                }
            };

            let stats = transfer_table(
                self.source.as_mut(),
                self.target.as_mut(),
                &name,
                &columns,
                budget,
                progress,
                &mut self.log,
            )
            .await?;
            summary.stats.push(stats);
        }
        Ok(())
    }

    async fn create_indexes(
        &mut self,
        schema: &SchemaSnapshot,
        target_schema: &SchemaSnapshot,
        summary: &mut RunSummary,
    ) -> Result<()> {
        self.log.section("Index creation")?;

        // Tables that already existed keep their own indexes
        for (table, indexes) in &schema.indexes {
            if !summary.created_tables.contains(table) || !target_schema.tables.contains_key(table)
            {
                continue;
            }
            for sql in create_index_statements(self.target.dialect(), table, indexes) {
                self.log.line(&sql)?;
                match self.target.execute(&sql).await {
                    Ok(_) => {
                        debug!("{}", sql);
                        summary.indexes_created += 1;
                    }
                    Err(e) => {
                        warn!("Index creation failed: {}: {}", sql, e);
                        self.log.warning(&format!("Error : {}\n  {}", sql, e))?;
                        summary.index_failures += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Test both connections without changing anything.
    pub async fn health_check(config: &Config) -> HealthCheckResult {
        let timer = Instant::now();
        let mysql = match MysqlEngine::connect(&config.mysql).await {
            Ok(engine) => Box::new(engine).close().await,
            Err(e) => Err(e),
        };
        let mysql_latency_ms = timer.elapsed().as_millis() as u64;

        let timer = Instant::now();
        let path = &config.sqlite.file;
        let sqlite = if path.exists() {
            match SqliteEngine::open(path, false).await {
                Ok(engine) => Box::new(engine).close().await,
                Err(e) => Err(e),
            }
        } else if config.options.direction() == Direction::SqliteToMysql {
            Err(MigrateError::Config(format!(
                "SQLite source {} does not exist",
                path.display()
            )))
        } else {
            Ok(())
        };
        let sqlite_latency_ms = timer.elapsed().as_millis() as u64;

        HealthCheckResult {
            mysql_connected: mysql.is_ok(),
            mysql_latency_ms,
            mysql_error: mysql.as_ref().err().map(ToString::to_string),
            sqlite_ok: sqlite.is_ok(),
            sqlite_latency_ms,
            sqlite_error: sqlite.as_ref().err().map(ToString::to_string),
            healthy: mysql.is_ok() && sqlite.is_ok(),
        }
    }
}
