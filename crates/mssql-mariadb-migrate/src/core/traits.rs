//! Core traits for the source and target connections.
//!
//! - [`SourceReader`]: catalog and row access on the source database
//! - [`TargetWriter`]: DDL, transactional inserts and audit rows on the target
//!
//! The migrators depend only on these traits, so the per-table state machines
//! can be exercised against in-memory doubles.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::Result;
use crate::state::AuditLogEntry;

use super::schema::ColumnDescriptor;
use super::value::{Row, SqlValue};

/// Read catalog metadata and rows from a source database.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// List base tables in the configured source schema, ordered by name.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Column metadata for a table, in catalog column order.
    ///
    /// An unknown table yields an empty list rather than an error.
    async fn fetch_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// Fetch at most `limit` rows from a table.
    async fn fetch_rows(&self, table: &str, limit: usize) -> Result<Vec<Row>>;

    /// Get the database type identifier.
    fn db_type(&self) -> &str;

    /// Close the connection.
    async fn close(&self);
}

/// Write schema, data and audit rows to a target database.
///
/// Transaction calls apply to the writer's single connection; every
/// [`insert_row`](TargetWriter::insert_row) between
/// [`begin_transaction`](TargetWriter::begin_transaction) and
/// [`commit`](TargetWriter::commit) / [`rollback`](TargetWriter::rollback)
/// belongs to that transaction.
#[async_trait]
pub trait TargetWriter: Send + Sync {
    /// Execute a DDL statement.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Remove every row from a table.
    async fn truncate_table(&self, table: &str) -> Result<()>;

    async fn begin_transaction(&self) -> Result<()>;

    /// Insert one row; `values` are in `columns` order.
    async fn insert_row(&self, table: &str, columns: &[String], values: &[SqlValue])
        -> Result<()>;

    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;

    /// Append one row to the audit log table.
    async fn write_audit_entry(&self, entry: &AuditLogEntry) -> Result<()>;

    /// Current time according to the target server.
    async fn server_timestamp(&self) -> Result<NaiveDateTime>;

    /// Get the database type identifier.
    fn db_type(&self) -> &str;

    /// Close the connection.
    async fn close(&self);
}
