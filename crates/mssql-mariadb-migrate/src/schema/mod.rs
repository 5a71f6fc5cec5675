//! Schema migration: source catalog to `CREATE TABLE IF NOT EXISTS` on the target.
//!
//! Tables are processed one at a time. A table with no discoverable columns
//! is skipped with a warning; catalog and DDL failures are logged and the run
//! moves on to the next table.

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::core::{SourceReader, TargetWriter};
use crate::dialect::{build_create_table, map_column};
use crate::error::{MigrateError, Result};
use crate::state::{TableReport, TableStatus};

/// Which tables a schema run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSelection {
    /// An operator-supplied list, processed in order.
    Listed(Vec<String>),

    /// Every base table in the source schema.
    Catalog,
}

/// Result of a schema migration run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaMigrationResult {
    /// Tables processed.
    pub tables_total: usize,

    /// Tables whose DDL was executed (or generated, for a dry run).
    pub created: usize,

    /// Tables with no discoverable columns.
    pub skipped: usize,

    pub failed: usize,

    pub failed_tables: Vec<String>,

    /// Whether DDL was only generated.
    pub dry_run: bool,

    pub tables: Vec<TableReport>,
}

impl SchemaMigrationResult {
    fn record(&mut self, report: TableReport) {
        self.tables_total += 1;
        if report.status.is_failure() {
            self.failed += 1;
            self.failed_tables.push(report.table.clone());
        } else if report.status == TableStatus::Skipped {
            self.skipped += 1;
        } else {
            self.created += 1;
        }
        self.tables.push(report);
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Creates target tables from source column metadata.
pub struct SchemaMigrator<'a> {
    source: &'a dyn SourceReader,
    target: &'a dyn TargetWriter,
    dry_run: bool,
}

impl<'a> SchemaMigrator<'a> {
    pub fn new(source: &'a dyn SourceReader, target: &'a dyn TargetWriter) -> Self {
        Self {
            source,
            target,
            dry_run: false,
        }
    }

    /// Generate and log DDL without executing it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolve the ordered table list for a selection.
    pub async fn list_source_tables(&self, selection: TableSelection) -> Result<Vec<String>> {
        match selection {
            TableSelection::Listed(tables) => Ok(tables),
            TableSelection::Catalog => self.source.list_tables().await,
        }
    }

    /// Run the schema migration.
    ///
    /// Only listing the catalog can fail the whole run; per-table errors are
    /// recorded in the result.
    pub async fn run(&self, selection: TableSelection) -> Result<SchemaMigrationResult> {
        let tables = self.list_source_tables(selection).await?;
        info!(
            "Migrating schema for {} tables{}",
            tables.len(),
            if self.dry_run { " (dry run)" } else { "" }
        );

        let mut result = SchemaMigrationResult {
            dry_run: self.dry_run,
            ..Default::default()
        };

        for table in &tables {
            let report = match self
                .migrate_table(table)
                .instrument(info_span!("table", name = %table))
                .await
            {
                Ok(report) => report,
                Err(e) => {
                    error!("{}", e);
                    TableReport::new(table, TableStatus::Failed, 0, e.to_string())
                }
            };
            result.record(report);
        }

        info!(
            "Schema migration finished: {} created, {} skipped, {} failed",
            result.created, result.skipped, result.failed
        );
        Ok(result)
    }

    async fn migrate_table(&self, table: &str) -> Result<TableReport> {
        let columns = self
            .source
            .fetch_columns(table)
            .await
            .map_err(|e| MigrateError::catalog_fetch(table, e))?;

        if columns.is_empty() {
            warn!("{}: no columns found in source catalog, skipping", table);
            return Ok(TableReport::new(
                table,
                TableStatus::Skipped,
                0,
                "no columns found",
            ));
        }

        let mapped: Vec<_> = columns.iter().map(map_column).collect();
        let ddl = build_create_table(table, &mapped);
        debug!("{}: {}", table, ddl);

        let count = mapped.len() as u64;
        if self.dry_run {
            info!("{}: DDL generated for {} columns (not executed)", table, count);
            return Ok(TableReport::new(table, TableStatus::DryRun, count, ddl));
        }

        self.target
            .execute(&ddl)
            .await
            .map_err(|e| MigrateError::ddl_execution(table, e))?;

        info!("{}: table ensured ({} columns)", table, count);
        Ok(TableReport::new(
            table,
            TableStatus::Completed,
            count,
            "table created or already present",
        ))
    }
}
