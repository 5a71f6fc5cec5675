//! mssql-mariadb-migrate CLI - MSSQL to MariaDB schema and data migration.

use clap::{Parser, Subcommand};
use mssql_mariadb_migrate::{
    load_table_list, Config, DataMigrationResult, MigrateError, Orchestrator,
    SchemaMigrationResult, TableSelection,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "mssql-mariadb-migrate")]
#[command(about = "MSSQL to MariaDB schema and data migration")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (default: read REMOTEDB_*/LOCALDB_* from the environment)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create target tables from source column metadata
    Schema {
        /// File with one table name per line (default: every base table in the source schema)
        tables: Option<PathBuf>,

        /// Print the generated DDL without executing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Copy rows table by table, one transaction per table
    Data {
        /// File with one table name per line
        tables: PathBuf,

        #[command(flatten)]
        overrides: DataOverrides,
    },

    /// Run schema migration, then data migration, for the same table list
    All {
        /// File with one table name per line
        tables: PathBuf,

        #[command(flatten)]
        overrides: DataOverrides,
    },

    /// Test database connections
    HealthCheck,
}

#[derive(clap::Args)]
struct DataOverrides {
    /// Truncate each target table before copying
    #[arg(long)]
    truncate: bool,

    /// Do not write audit log rows
    #[arg(long)]
    no_audit: bool,

    /// Override the per-table row limit
    #[arg(long)]
    row_limit: Option<usize>,
}

impl DataOverrides {
    fn apply(&self, config: &mut Config) -> Result<(), MigrateError> {
        if self.truncate {
            config.migration.truncate_before_insert = true;
        }
        if self.no_audit {
            config.migration.audit_logging = false;
        }
        if let Some(limit) = self.row_limit {
            config.migration.row_limit = limit;
        }
        config.validate()
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

    // The table list is checked before any connection is opened.
    let tables = match &cli.command {
        Commands::Schema {
            tables: Some(path), ..
        }
        | Commands::Data { tables: path, .. }
        | Commands::All { tables: path, .. } => Some(load_table_list(path)?),
        Commands::Schema { tables: None, .. } | Commands::HealthCheck => None,
    };

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::HealthCheck => health_check(&config, cli.output_json).await,

        Commands::Schema { dry_run, .. } => {
            let selection = match tables {
                Some(tables) => TableSelection::Listed(tables),
                None => TableSelection::Catalog,
            };
            let orchestrator = Orchestrator::connect(config).await?;
            let outcome = orchestrator.migrate_schema(selection, dry_run).await;
            orchestrator.close().await;
            print_schema_result(&outcome?, cli.output_json)
        }

        Commands::Data { overrides, .. } => {
            overrides.apply(&mut config)?;
            let tables = tables.unwrap_or_default();
            let cancel = setup_signal_handler()?;

            let orchestrator = Orchestrator::connect(config).await?;
            let outcome = orchestrator.migrate_data(&tables, &cancel).await;
            orchestrator.close().await;
            print_data_result(&outcome?, cli.output_json)
        }

        Commands::All { overrides, .. } => {
            overrides.apply(&mut config)?;
            let tables = tables.unwrap_or_default();
            let cancel = setup_signal_handler()?;

            let orchestrator = Orchestrator::connect(config).await?;
            let outcome = async {
                let schema = orchestrator
                    .migrate_schema(TableSelection::Listed(tables.clone()), false)
                    .await?;
                let data = orchestrator.migrate_data(&tables, &cancel).await?;
                Ok::<_, MigrateError>((schema, data))
            }
            .await;
            orchestrator.close().await;

            let (schema, data) = outcome?;
            if cli.output_json {
                let combined = serde_json::json!({ "schema": schema, "data": data });
                println!("{}", serde_json::to_string_pretty(&combined)?);
                return finish_data(&data);
            }
            print_schema_result(&schema, false)?;
            print_data_result(&data, false)
        }
    }
}

/// Load configuration from a YAML file, or from the environment when no file is given.
fn load_config(path: Option<&Path>) -> Result<Config, MigrateError> {
    match path {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            Ok(config)
        }
        None => {
            let config = Config::from_env()?;
            info!("Loaded configuration from environment");
            Ok(config)
        }
    }
}

async fn health_check(config: &Config, output_json: bool) -> Result<(), MigrateError> {
    let result = Orchestrator::health_check(config).await;

    if output_json {
        println!("{}", result.to_json()?);
    } else {
        println!("Health Check Results:");
        println!(
            "  Source (MSSQL): {} ({}ms)",
            if result.source_connected { "OK" } else { "FAILED" },
            result.source_latency_ms
        );
        if let Some(ref err) = result.source_error {
            println!("    Error: {}", err);
        }
        println!(
            "  Target (MariaDB): {} ({}ms)",
            if result.target_connected { "OK" } else { "FAILED" },
            result.target_latency_ms
        );
        if let Some(ref err) = result.target_error {
            println!("    Error: {}", err);
        }
        println!(
            "\n  Overall: {}",
            if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
        );
    }

    if !result.healthy {
        return Err(MigrateError::connection(
            if result.source_connected { "target" } else { "source" },
            "health check failed",
        ));
    }
    Ok(())
}

fn print_schema_result(
    result: &SchemaMigrationResult,
    output_json: bool,
) -> Result<(), MigrateError> {
    if output_json {
        println!("{}", result.to_json()?);
        return Ok(());
    }

    if result.dry_run {
        for table in &result.tables {
            println!("-- {}\n{};\n", table.table, table.message);
        }
    }
    println!(
        "\n{}",
        if result.dry_run { "Schema dry run completed!" } else { "Schema migration completed!" }
    );
    println!("  Tables: {}", result.tables_total);
    println!("  Created: {}", result.created);
    println!("  Skipped: {}", result.skipped);
    if !result.failed_tables.is_empty() {
        println!("  Failed tables: {:?}", result.failed_tables);
    }
    Ok(())
}

fn print_data_result(result: &DataMigrationResult, output_json: bool) -> Result<(), MigrateError> {
    if output_json {
        println!("{}", result.to_json()?);
    } else {
        println!(
            "\n{}",
            if result.is_cancelled() {
                "Data migration cancelled."
            } else if result.is_aborted() {
                "Data migration aborted."
            } else {
                "Data migration completed!"
            }
        );
        println!("  Run ID: {}", result.run_id);
        println!("  Duration: {:.2}s", result.duration_seconds);
        println!("  Tables: {}/{}", result.tables_success, result.tables_total);
        println!("  Skipped: {}", result.tables_skipped);
        println!("  Rows: {}", result.rows_transferred);
        if result.audit_failures > 0 {
            println!("  Audit write failures: {}", result.audit_failures);
        }
        if !result.failed_tables.is_empty() {
            println!("  Failed tables: {:?}", result.failed_tables);
        }
    }
    finish_data(result)
}

/// A cancelled or aborted run still prints its partial result but exits non-zero.
fn finish_data(result: &DataMigrationResult) -> Result<(), MigrateError> {
    if result.is_cancelled() {
        return Err(MigrateError::Cancelled);
    }
    if result.is_aborted() {
        return Err(MigrateError::connection(
            "target",
            "transaction state unknown after a failed rollback",
        ));
    }
    Ok(())
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

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// The returned token is cancelled when a signal is received; the table in
/// progress finishes before the run stops.
#[cfg(unix)]
fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => eprintln!("\nReceived SIGINT. Finishing current table..."),
            _ = sigterm.recv() => eprintln!("\nReceived SIGTERM. Finishing current table..."),
        }
        token.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Finishing current table...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
