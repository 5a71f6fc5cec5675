//! Data migration: bounded row copy per table inside one transaction.
//!
//! Each table goes through
//! `[truncate] -> fetch -> (empty? skip) -> begin -> insert* -> commit | rollback -> audit`.
//! A table's rows are either all committed or all rolled back. Exactly one
//! audit row is written per table when audit logging is enabled, after the
//! transaction has concluded. A failed rollback leaves the target session in
//! an unknown transaction state, so the run is aborted after that table.

use std::time::Instant;

use chrono::NaiveDateTime;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::MigrationConfig;
use crate::core::{Row, SourceReader, TargetWriter};
use crate::error::{MigrateError, Result};
use crate::state::{AuditLogEntry, MigrationRun, RunId, TableReport, TableStatus};

/// Result description recorded for tables with no source rows.
pub const SKIPPED_NO_DATA: &str = "skipped, no data";

/// Behaviour switches for a data run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMigrationOptions {
    /// Write one audit row per table.
    pub audit_logging: bool,

    /// Truncate each target table before fetching its rows.
    pub truncate_before_insert: bool,

    /// Maximum rows fetched per table.
    pub row_limit: usize,
}

impl Default for DataMigrationOptions {
    fn default() -> Self {
        Self::from(&MigrationConfig::default())
    }
}

impl From<&MigrationConfig> for DataMigrationOptions {
    fn from(config: &MigrationConfig) -> Self {
        Self {
            audit_logging: config.audit_logging,
            truncate_before_insert: config.truncate_before_insert,
            row_limit: config.row_limit,
        }
    }
}

/// Result of a data migration run.
#[derive(Debug, Clone, Serialize)]
pub struct DataMigrationResult {
    /// Run identifier shared by every audit row of this run.
    pub run_id: RunId,

    /// Final status: "completed", "cancelled" or "aborted".
    pub status: String,

    /// Target server time when the run started.
    pub started_at: NaiveDateTime,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Tables processed.
    pub tables_total: usize,

    /// Tables whose rows were committed.
    pub tables_success: usize,

    /// Tables with no source rows.
    pub tables_skipped: usize,

    pub tables_failed: usize,

    /// Rows committed across all tables.
    pub rows_transferred: u64,

    /// Audit rows that could not be written.
    pub audit_failures: usize,

    pub failed_tables: Vec<String>,

    pub tables: Vec<TableReport>,
}

impl DataMigrationResult {
    fn new(run: &MigrationRun) -> Self {
        Self {
            run_id: run.run_id.clone(),
            status: "completed".to_string(),
            started_at: run.started_at,
            duration_seconds: 0.0,
            tables_total: 0,
            tables_success: 0,
            tables_skipped: 0,
            tables_failed: 0,
            rows_transferred: 0,
            audit_failures: 0,
            failed_tables: Vec::new(),
            tables: Vec::new(),
        }
    }

    fn record(&mut self, report: TableReport) {
        self.tables_total += 1;
        if report.status.is_failure() {
            self.tables_failed += 1;
            self.failed_tables.push(report.table.clone());
        } else if report.status == TableStatus::Completed {
            self.tables_success += 1;
            self.rows_transferred += report.count;
        } else {
            self.tables_skipped += 1;
        }
        self.tables.push(report);
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == "cancelled"
    }

    /// True when the run stopped because the target session could not be
    /// returned to a clean state.
    pub fn is_aborted(&self) -> bool {
        self.status == "aborted"
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Copies bounded row sets from source to target, one table at a time.
pub struct DataMigrator<'a> {
    source: &'a dyn SourceReader,
    target: &'a dyn TargetWriter,
    options: DataMigrationOptions,
}

impl<'a> DataMigrator<'a> {
    pub fn new(
        source: &'a dyn SourceReader,
        target: &'a dyn TargetWriter,
        options: DataMigrationOptions,
    ) -> Self {
        Self {
            source,
            target,
            options,
        }
    }

    /// Run the data migration over `tables` in order.
    ///
    /// Fails only when the run cannot start (the run id cannot be read from
    /// the target). Cancellation is honoured between tables; the table in
    /// progress always finishes its transaction and audit row. A failed
    /// rollback stops the run with status "aborted".
    pub async fn run(
        &self,
        tables: &[String],
        cancel: &CancellationToken,
    ) -> Result<DataMigrationResult> {
        let run = MigrationRun::start(self.target).await?;
        let timer = Instant::now();
        info!(
            "Starting data run {} for {} tables (row limit {}, truncate {}, audit {})",
            run.run_id,
            tables.len(),
            self.options.row_limit,
            self.options.truncate_before_insert,
            self.options.audit_logging
        );

        let mut result = DataMigrationResult::new(&run);
        for table in tables {
            if cancel.is_cancelled() {
                warn!("Data run {} cancelled before table {}", run.run_id, table);
                result.status = "cancelled".to_string();
                break;
            }

            let outcome = self
                .copy_table(table)
                .instrument(info_span!("table", name = %table))
                .await;
            if self.options.audit_logging && !self.write_audit(&run.run_id, &outcome.report).await {
                result.audit_failures += 1;
            }
            result.record(outcome.report);

            if outcome.session_lost {
                error!(
                    "Data run {} aborted after table {}: target transaction state unknown",
                    run.run_id, table
                );
                result.status = "aborted".to_string();
                break;
            }
        }

        result.duration_seconds = timer.elapsed().as_secs_f64();
        info!(
            "Data run {} {}: {} succeeded, {} skipped, {} failed, {} rows in {:.2}s",
            result.run_id,
            result.status,
            result.tables_success,
            result.tables_skipped,
            result.tables_failed,
            result.rows_transferred,
            result.duration_seconds
        );
        Ok(result)
    }

    /// Copy one table. Never fails; the outcome is carried in the report.
    async fn copy_table(&self, table: &str) -> TableOutcome {
        info!("{}: starting", table);

        if self.options.truncate_before_insert {
            if let Err(e) = self.target.truncate_table(table).await {
                let err = MigrateError::truncate(table, e);
                error!("{}", err);
                return TableReport::new(table, TableStatus::Failed, 0, err.to_string()).into();
            }
        }

        let (columns, rows) = match self.fetch(table).await {
            Ok(fetched) => fetched,
            Err(e) => {
                error!("{}", e);
                return TableReport::new(table, TableStatus::Failed, 0, e.to_string()).into();
            }
        };

        if rows.is_empty() {
            warn!("{}: no rows in source, skipping", table);
            return TableReport::new(table, TableStatus::Skipped, 0, SKIPPED_NO_DATA).into();
        }

        let attempted = rows.len() as u64;
        if let Err(e) = self.target.begin_transaction().await {
            let err = MigrateError::insert(table, format!("begin failed: {}", e));
            error!("{}", err);
            return TableReport::new(table, TableStatus::Failed, attempted, err.to_string())
                .into();
        }

        match self.insert_all(table, &columns, &rows).await {
            Ok(()) => {
                info!("{}: committed {} rows", table, attempted);
                TableReport::new(
                    table,
                    TableStatus::Completed,
                    attempted,
                    format!("{} rows copied", attempted),
                )
                .into()
            }
            Err(e) => {
                error!("{}; rolling back", e);
                match self.target.rollback().await {
                    Ok(()) => {
                        TableReport::new(table, TableStatus::RolledBack, attempted, e.to_string())
                            .into()
                    }
                    Err(rb) => {
                        error!("{}: rollback failed: {}", table, rb);
                        TableOutcome {
                            report: TableReport::new(
                                table,
                                TableStatus::Failed,
                                attempted,
                                format!("{}; rollback failed: {}", e, rb),
                            ),
                            session_lost: true,
                        }
                    }
                }
            }
        }
    }

    async fn fetch(&self, table: &str) -> Result<(Vec<String>, Vec<Row>)> {
        let rows = self
            .source
            .fetch_rows(table, self.options.row_limit)
            .await
            .map_err(|e| MigrateError::row_fetch(table, e))?;
        let columns = column_list(table, &rows)?;
        Ok((columns, rows))
    }

    /// Insert every row and commit. Any error leaves the transaction open for
    /// the caller to roll back.
    async fn insert_all(&self, table: &str, columns: &[String], rows: &[Row]) -> Result<()> {
        for (idx, row) in rows.iter().enumerate() {
            self.target
                .insert_row(table, columns, row.values())
                .await
                .map_err(|e| MigrateError::insert(table, format!("row {}: {}", idx + 1, e)))?;
        }
        self.target
            .commit()
            .await
            .map_err(|e| MigrateError::insert(table, format!("commit failed: {}", e)))
    }

    /// Write the audit row for a finished table. Returns false if it failed.
    async fn write_audit(&self, run_id: &RunId, report: &TableReport) -> bool {
        let entry = AuditLogEntry {
            run_id: run_id.to_string(),
            table_name: report.table.clone(),
            row_count: report.count,
            result_desc: report.message.clone(),
        };
        match self.target.write_audit_entry(&entry).await {
            Ok(()) => true,
            Err(e) => {
                error!("{}", MigrateError::audit_write(&report.table, e));
                false
            }
        }
    }
}

/// Report for one table plus whether the target session is still usable.
struct TableOutcome {
    report: TableReport,
    session_lost: bool,
}

impl From<TableReport> for TableOutcome {
    fn from(report: TableReport) -> Self {
        Self {
            report,
            session_lost: false,
        }
    }
}

/// Column list for the INSERT, taken from the first row.
///
/// Every row must carry the same columns in the same order.
fn column_list(table: &str, rows: &[Row]) -> Result<Vec<String>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    for (idx, row) in rows.iter().enumerate().skip(1) {
        if row.columns() != first.columns() {
            return Err(MigrateError::row_fetch(
                table,
                format!("row {} has a different column set than row 1", idx + 1),
            ));
        }
    }
    Ok(first.columns().to_vec())
}
