//! In-memory source and target doubles for migrator tests.
//!
//! Both doubles append to a shared [`Journal`] so tests can assert on the
//! interleaving of source and target calls.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{MigrateError, Result};
use crate::state::AuditLogEntry;

use super::schema::ColumnDescriptor;
use super::traits::{SourceReader, TargetWriter};
use super::value::{Row, SqlValue};

/// Ordered record of calls made against the doubles.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

#[derive(Default)]
pub struct MockSource {
    journal: Journal,
    catalog: Vec<String>,
    columns: HashMap<String, Vec<ColumnDescriptor>>,
    rows: HashMap<String, Vec<Row>>,
    failing_catalog: HashSet<String>,
    failing_fetch: HashSet<String>,
}

impl MockSource {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            ..Default::default()
        }
    }

    /// Register a table with columns and rows.
    pub fn with_table(mut self, table: &str, columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        self.catalog.push(table.to_string());
        self.catalog.sort();
        self.columns.insert(table.to_string(), columns);
        self.rows.insert(table.to_string(), rows);
        self
    }

    pub fn failing_catalog(mut self, table: &str) -> Self {
        self.failing_catalog.insert(table.to_string());
        self
    }

    pub fn failing_fetch(mut self, table: &str) -> Self {
        self.failing_fetch.insert(table.to_string());
        self
    }
}

#[async_trait]
impl SourceReader for MockSource {
    async fn list_tables(&self) -> Result<Vec<String>> {
        self.journal.push("list_tables");
        Ok(self.catalog.clone())
    }

    async fn fetch_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.journal.push(format!("fetch_columns {}", table));
        if self.failing_catalog.contains(table) {
            return Err(MigrateError::Protocol("catalog unavailable".into()));
        }
        Ok(self.columns.get(table).cloned().unwrap_or_default())
    }

    async fn fetch_rows(&self, table: &str, limit: usize) -> Result<Vec<Row>> {
        self.journal.push(format!("fetch_rows {}", table));
        if self.failing_fetch.contains(table) {
            return Err(MigrateError::Protocol("read aborted".into()));
        }
        let rows = self.rows.get(table).cloned().unwrap_or_default();
        Ok(rows.into_iter().take(limit).collect())
    }

    fn db_type(&self) -> &str {
        "mock"
    }

    async fn close(&self) {
        self.journal.push("close source");
    }
}

/// Target double that simulates `CREATE TABLE IF NOT EXISTS` and row counts.
#[derive(Default)]
pub struct MockTarget {
    journal: Journal,
    tables: Mutex<BTreeSet<String>>,
    committed_rows: Mutex<HashMap<String, usize>>,
    pending_rows: Mutex<HashMap<String, usize>>,
    audit: Mutex<Vec<AuditLogEntry>>,
    ddl: Mutex<Vec<String>>,
    fail_insert_at: Option<usize>,
    failing_ddl: HashSet<String>,
    fail_audit: bool,
    fail_clock: bool,
    fail_truncate: bool,
    fail_begin: bool,
    fail_commit: bool,
    fail_rollback: bool,
    inserts_in_txn: Mutex<usize>,
}

impl MockTarget {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            ..Default::default()
        }
    }

    /// Fail the n-th insert (1-based) of every transaction.
    pub fn failing_insert_at(mut self, n: usize) -> Self {
        self.fail_insert_at = Some(n);
        self
    }

    pub fn failing_ddl(mut self, table: &str) -> Self {
        self.failing_ddl.insert(table.to_string());
        self
    }

    pub fn failing_audit(mut self) -> Self {
        self.fail_audit = true;
        self
    }

    pub fn failing_clock(mut self) -> Self {
        self.fail_clock = true;
        self
    }

    pub fn failing_truncate(mut self) -> Self {
        self.fail_truncate = true;
        self
    }

    pub fn failing_begin(mut self) -> Self {
        self.fail_begin = true;
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    pub fn tables(&self) -> BTreeSet<String> {
        self.tables.lock().unwrap().clone()
    }

    pub fn ddl(&self) -> Vec<String> {
        self.ddl.lock().unwrap().clone()
    }

    pub fn audit(&self) -> Vec<AuditLogEntry> {
        self.audit.lock().unwrap().clone()
    }

    pub fn committed_rows(&self, table: &str) -> usize {
        self.committed_rows
            .lock()
            .unwrap()
            .get(table)
            .copied()
            .unwrap_or(0)
    }

    /// Time reported by `server_timestamp`.
    pub fn clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(14, 25, 30)
            .unwrap()
    }
}

fn created_table(sql: &str) -> Option<String> {
    let start = sql.find('`')? + 1;
    let end = start + sql[start..].find('`')?;
    Some(sql[start..end].to_string())
}

#[async_trait]
impl TargetWriter for MockTarget {
    async fn execute(&self, sql: &str) -> Result<()> {
        let table = created_table(sql).unwrap_or_default();
        self.journal.push(format!("execute {}", table));
        if self.failing_ddl.contains(&table) {
            return Err(MigrateError::Protocol("syntax error".into()));
        }
        self.ddl.lock().unwrap().push(sql.to_string());
        self.tables.lock().unwrap().insert(table);
        Ok(())
    }

    async fn truncate_table(&self, table: &str) -> Result<()> {
        self.journal.push(format!("truncate {}", table));
        if self.fail_truncate {
            return Err(MigrateError::Protocol("table is locked".into()));
        }
        self.committed_rows.lock().unwrap().remove(table);
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.journal.push("begin");
        if self.fail_begin {
            return Err(MigrateError::Protocol("lock wait timeout".into()));
        }
        *self.inserts_in_txn.lock().unwrap() = 0;
        self.pending_rows.lock().unwrap().clear();
        Ok(())
    }

    async fn insert_row(
        &self,
        table: &str,
        columns: &[String],
        values: &[SqlValue],
    ) -> Result<()> {
        self.journal.push(format!("insert {}", table));
        assert_eq!(columns.len(), values.len());
        let mut inserted = self.inserts_in_txn.lock().unwrap();
        *inserted += 1;
        if self.fail_insert_at == Some(*inserted) {
            return Err(MigrateError::Protocol("duplicate entry".into()));
        }
        *self
            .pending_rows
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default() += 1;
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.journal.push("commit");
        if self.fail_commit {
            return Err(MigrateError::Protocol("deadlock found".into()));
        }
        let pending: Vec<_> = self.pending_rows.lock().unwrap().drain().collect();
        let mut committed = self.committed_rows.lock().unwrap();
        for (table, n) in pending {
            *committed.entry(table).or_default() += n;
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.journal.push("rollback");
        if self.fail_rollback {
            return Err(MigrateError::connection("target", "server has gone away"));
        }
        self.pending_rows.lock().unwrap().clear();
        Ok(())
    }

    async fn write_audit_entry(&self, entry: &AuditLogEntry) -> Result<()> {
        self.journal.push(format!("audit {}", entry.table_name));
        if self.fail_audit {
            return Err(MigrateError::Protocol("audit table missing".into()));
        }
        self.audit.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn server_timestamp(&self) -> Result<NaiveDateTime> {
        if self.fail_clock {
            return Err(MigrateError::connection("target", "server has gone away"));
        }
        Ok(Self::clock())
    }

    fn db_type(&self) -> &str {
        "mock"
    }

    async fn close(&self) {
        self.journal.push("close target");
    }
}
