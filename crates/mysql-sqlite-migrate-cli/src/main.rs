//! mysql-sqlite-migrate CLI - MySQL/MariaDB to SQLite migration and back.

use clap::{Parser, Subcommand, ValueEnum};
use dialoguer::Input;
use mysql_sqlite_migrate::{
    AlwaysDecline, AssumeYes, Config, ConfirmationGate, MigrateError, MigrationResult,
    Orchestrator, TableSelection,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "mysql-sqlite-migrate")]
#[command(about = "Migrate tables between MySQL/MariaDB and SQLite")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "migrate.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Do not print progress dots to stderr
    #[arg(long)]
    no_progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceEngine {
    Mysql,
    Sqlite,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a migration
    Run {
        /// Override the source engine
        #[arg(long, value_enum)]
        source: Option<SourceEngine>,

        /// Override the table allow-list (comma-separated)
        #[arg(long)]
        tables: Option<String>,

        /// Overwrite the SQLite file, or truncate the MySQL tables
        #[arg(long)]
        delete_existing_data: bool,

        /// Do not ask before truncating MySQL tables
        #[arg(long, short)]
        yes: bool,
    },

    /// Test database connections
    HealthCheck,
}

/// Asks the operator to type `yes` on the terminal.
struct TerminalGate;

impl ConfirmationGate for TerminalGate {
    fn confirm_truncate(
        &mut self,
        target: &str,
        tables: &[String],
    ) -> mysql_sqlite_migrate::Result<bool> {
        eprintln!("The following tables in {} will be emptied:", target);
        for table in tables {
            eprintln!("  {}", table);
        }
        let answer: String = Input::new()
            .with_prompt("Type 'yes' to continue")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| MigrateError::Io(std::io::Error::other(e.to_string())))?;
        Ok(answer.trim() == "yes")
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run {
            source,
            tables,
            delete_existing_data,
            yes,
        } => {
            // Apply overrides
            if let Some(source) = source {
                config.options.source = match source {
                    SourceEngine::Mysql => "mysql".to_string(),
                    SourceEngine::Sqlite => "sqlite".to_string(),
                };
            }
            if let Some(tables) = tables {
                config.options.tables = TableSelection::Csv(tables);
            }
            if delete_existing_data {
                config.options.delete_existing_data = true;
            }
            config.validate()?;

            let gate: Box<dyn ConfirmationGate> = if yes {
                Box::new(AssumeYes)
            } else if std::io::stdin().is_terminal() {
                Box::new(TerminalGate)
            } else {
                Box::new(AlwaysDecline)
            };

            let result = Orchestrator::new(config)
                .await?
                .with_confirmation(gate)
                .with_progress(!cli.no_progress && !cli.output_json)
                .run()
                .await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_summary(&result);
            }
        }

        Commands::HealthCheck => {
            let result = Orchestrator::health_check(&config).await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  MySQL: {} ({}ms)",
                    if result.mysql_connected { "OK" } else { "FAILED" },
                    result.mysql_latency_ms
                );
                if let Some(ref err) = result.mysql_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  SQLite: {} ({}ms)",
                    if result.sqlite_ok { "OK" } else { "FAILED" },
                    result.sqlite_latency_ms
                );
                if let Some(ref err) = result.sqlite_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(MigrateError::connection(
                    "Health check failed",
                    "health-check",
                ));
            }
        }
    }

    Ok(())
}

fn print_summary(result: &MigrationResult) {
    println!("\nMigration completed! ({})", result.direction);
    println!("  Duration: {:.2}s", result.duration_seconds);
    println!(
        "  Tables: {}/{}",
        result.tables_transferred, result.tables_total
    );
    println!(
        "  Rows: {} inserted, {} ignored, {} failed",
        result.rows_inserted, result.rows_ignored, result.row_errors
    );
    println!(
        "  Indexes: {} created, {} failed",
        result.indexes_created, result.index_failures
    );
    if !result.skipped_tables.is_empty() {
        println!("  Skipped tables: {:?}", result.skipped_tables);
    }
    if !result.failed_tables.is_empty() {
        println!("  Failed tables: {:?}", result.failed_tables);
    }
    if let Some(ref path) = result.log_file {
        println!("  Structure log: {}", path.display());
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
