//! Run identity and per-table outcomes.
//!
//! A data run is identified by a [`RunId`] derived from the target server's
//! clock. Every table processed in the run produces one [`TableReport`] and,
//! when audit logging is on, one [`AuditLogEntry`] in the target's audit table.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::TargetWriter;
use crate::error::Result;

/// Prefix shared by all data run identifiers.
pub const RUN_ID_PREFIX: &str = "DM_";

/// Identifier of one data migration run, e.g. `DM_250301142530`.
///
/// The timestamp part is `YYMMDDHHMMSS`, so identifiers sort
/// lexicographically in time order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Derive a run id from a server timestamp.
    pub fn from_server_time(timestamp: NaiveDateTime) -> Self {
        Self(format!("{}{}", RUN_ID_PREFIX, timestamp.format("%y%m%d%H%M%S")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A data migration run in progress.
#[derive(Debug, Clone)]
pub struct MigrationRun {
    pub run_id: RunId,

    /// Target server time when the run started.
    pub started_at: NaiveDateTime,
}

impl MigrationRun {
    /// Start a run, reading the current time from the target server.
    pub async fn start(target: &dyn TargetWriter) -> Result<Self> {
        let started_at = target.server_timestamp().await?;
        Ok(Self {
            run_id: RunId::from_server_time(started_at),
            started_at,
        })
    }
}

/// One row of the target's audit log table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Run identifier (`work_id` column).
    pub run_id: String,

    /// Table processed (`table_name` column).
    pub table_name: String,

    /// Rows attempted (`data_rows` column).
    pub row_count: u64,

    /// Outcome message (`result_desc` column).
    pub result_desc: String,
}

/// Outcome of processing one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// DDL executed (schema) or rows committed (data).
    Completed,

    /// Nothing to do: no columns discovered or no source rows.
    Skipped,

    /// DDL generated but not executed.
    DryRun,

    /// Inserts failed and the transaction was rolled back.
    RolledBack,

    /// Failed before any transaction was opened.
    Failed,
}

impl TableStatus {
    pub fn is_failure(self) -> bool {
        matches!(self, TableStatus::RolledBack | TableStatus::Failed)
    }
}

/// Per-table result included in run reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub status: TableStatus,

    /// Columns mapped (schema) or rows attempted (data).
    pub count: u64,

    pub message: String,
}

impl TableReport {
    pub fn new(
        table: impl Into<String>,
        status: TableStatus,
        count: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            status,
            count,
            message: message.into(),
        }
    }
}
