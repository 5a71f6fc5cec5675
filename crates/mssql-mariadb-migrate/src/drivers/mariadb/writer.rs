//! MariaDB target writer implementation.
//!
//! Implements the `TargetWriter` trait over one mysql_async connection.
//! Transactions are driven with explicit statements so that every insert
//! between `begin_transaction` and `commit`/`rollback` shares the session.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDateTime, Timelike};
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Params, Value};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::TargetConfig;
use crate::core::{SqlValue, TargetWriter};
use crate::dialect::quote_ident;
use crate::drivers::with_deadline;
use crate::error::{MigrateError, Result};
use crate::state::AuditLogEntry;

const SERVER_TIME_QUERY: &str = "SELECT DATE_FORMAT(NOW(), '%Y-%m-%d %H:%i:%s')";
const SERVER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// MariaDB target writer over one long-lived connection.
pub struct MariaDbWriter {
    conn: Mutex<Option<Conn>>,
    audit_table: String,
    timeout: Option<Duration>,
}

impl MariaDbWriter {
    /// Connect to the target database.
    pub async fn connect(
        config: &TargetConfig,
        audit_table: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let opts = OptsBuilder::default()
            .ip_or_hostname(&config.host)
            .tcp_port(config.port)
            .db_name(Some(&config.database))
            .user(Some(&config.user))
            .pass(Some(&config.password))
            .init(vec!["SET NAMES utf8mb4"]);

        let conn = with_deadline(timeout, "connecting to MariaDB target", async {
            Conn::new(opts)
                .await
                .map_err(|e| MigrateError::connection("target", e))
        })
        .await?;

        info!(
            "Connected to MariaDB target: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            audit_table: audit_table.into(),
            timeout,
        })
    }

    async fn query_drop(&self, operation: &str, sql: &str) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = active(&mut guard)?;
        with_deadline(self.timeout, operation, async {
            conn.query_drop(sql).await?;
            Ok(())
        })
        .await
    }

    async fn exec_drop(&self, operation: &str, sql: &str, params: Vec<Value>) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = active(&mut guard)?;
        with_deadline(self.timeout, operation, async {
            conn.exec_drop(sql, Params::Positional(params)).await?;
            Ok(())
        })
        .await
    }
}

fn active<'g>(guard: &'g mut MutexGuard<'_, Option<Conn>>) -> Result<&'g mut Conn> {
    guard
        .as_mut()
        .ok_or_else(|| MigrateError::connection("target", "connection already closed"))
}

/// Build a positional INSERT for one row.
fn insert_statement(table: &str, columns: &[String]) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        column_list,
        placeholders
    )
}

fn audit_statement(audit_table: &str) -> String {
    format!(
        "INSERT INTO {} (work_id, table_name, data_rows, result_desc) VALUES (?, ?, ?, ?)",
        quote_ident(audit_table)
    )
}

fn parse_server_time(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), SERVER_TIME_FORMAT).map_err(|e| {
        MigrateError::Protocol(format!("cannot parse server time '{}': {}", text, e))
    })
}

#[async_trait]
impl TargetWriter for MariaDbWriter {
    async fn execute(&self, sql: &str) -> Result<()> {
        self.query_drop("executing DDL", sql).await
    }

    async fn truncate_table(&self, table: &str) -> Result<()> {
        let sql = format!("TRUNCATE TABLE {}", quote_ident(table));
        self.query_drop("truncating table", &sql).await?;
        debug!("Truncated {}", table);
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.query_drop("starting transaction", "START TRANSACTION")
            .await
    }

    async fn insert_row(
        &self,
        table: &str,
        columns: &[String],
        values: &[SqlValue],
    ) -> Result<()> {
        let sql = insert_statement(table, columns);
        let params = values.iter().map(sql_value_to_mysql).collect();
        self.exec_drop("inserting row", &sql, params).await
    }

    async fn commit(&self) -> Result<()> {
        self.query_drop("committing transaction", "COMMIT").await
    }

    /// Roll back the open transaction. If that fails the connection is
    /// dropped, which makes the server discard the transaction; every later
    /// call fails with a connection error.
    async fn rollback(&self) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = active(&mut guard)?;
        let outcome = with_deadline(self.timeout, "rolling back transaction", async {
            conn.query_drop("ROLLBACK").await?;
            Ok(())
        })
        .await;
        if let Err(ref e) = outcome {
            warn!("Rollback failed ({}); discarding target connection", e);
            guard.take();
        }
        outcome
    }

    async fn write_audit_entry(&self, entry: &AuditLogEntry) -> Result<()> {
        let sql = audit_statement(&self.audit_table);
        let params = vec![
            Value::from(entry.run_id.as_str()),
            Value::from(entry.table_name.as_str()),
            Value::from(entry.row_count),
            Value::from(entry.result_desc.as_str()),
        ];
        self.exec_drop("writing audit entry", &sql, params).await
    }

    async fn server_timestamp(&self) -> Result<NaiveDateTime> {
        let mut guard = self.conn.lock().await;
        let conn = active(&mut guard)?;
        let text = with_deadline(self.timeout, "reading server time", async {
            Ok(conn.query_first::<String, _>(SERVER_TIME_QUERY).await?)
        })
        .await?
        .ok_or_else(|| MigrateError::Protocol("NOW() returned no rows".to_string()))?;
        parse_server_time(&text)
    }

    fn db_type(&self) -> &str {
        "mariadb"
    }

    async fn close(&self) {
        if let Some(conn) = self.conn.lock().await.take() {
            if let Err(e) = conn.disconnect().await {
                warn!("Error closing MariaDB connection: {}", e);
            }
        }
    }
}

/// Convert SqlValue to mysql_async::Value.
fn sql_value_to_mysql(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Bool(b) => Value::Int(i64::from(*b)),
        SqlValue::I16(i) => Value::Int(i64::from(*i)),
        SqlValue::I32(i) => Value::Int(i64::from(*i)),
        SqlValue::I64(i) => Value::Int(*i),
        SqlValue::F32(f) => Value::Float(*f),
        SqlValue::F64(f) => Value::Double(*f),
        SqlValue::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
        SqlValue::Bytes(b) => Value::Bytes(b.clone()),
        SqlValue::Uuid(u) => Value::Bytes(u.to_string().into_bytes()),
        SqlValue::Decimal(d) => Value::Bytes(d.to_string().into_bytes()),
        SqlValue::DateTime(dt) => Value::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.nanosecond() / 1_000,
        ),
        SqlValue::Date(d) => Value::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0),
        SqlValue::Time(t) => Value::Time(
            false,
            0,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
            t.nanosecond() / 1_000,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_discarded_connection_rejects_further_work() {
        let writer = MariaDbWriter {
            conn: Mutex::new(None),
            audit_table: "migration_log".to_string(),
            timeout: None,
        };

        let err = writer.rollback().await.unwrap_err();
        assert!(matches!(err, MigrateError::Connection { .. }));
        assert!(err.to_string().contains("connection already closed"));
        assert!(writer.begin_transaction().await.is_err());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_insert_statement() {
        let columns = vec!["id".to_string(), "total".to_string()];
        assert_eq!(
            insert_statement("orders", &columns),
            "INSERT INTO `orders` (`id`, `total`) VALUES (?, ?)"
        );
    }

    #[test]
    fn test_audit_statement() {
        assert_eq!(
            audit_statement("migration_log"),
            "INSERT INTO `migration_log` (work_id, table_name, data_rows, result_desc) VALUES (?, ?, ?, ?)"
        );
    }

    #[test]
    fn test_parse_server_time() {
        let ts = parse_server_time("2025-03-01 14:25:30").unwrap();
        assert_eq!(ts.format("%y%m%d%H%M%S").to_string(), "250301142530");
        assert!(matches!(
            parse_server_time("yesterday"),
            Err(MigrateError::Protocol(_))
        ));
    }

    #[test]
    fn test_scalar_conversion() {
        assert_eq!(sql_value_to_mysql(&SqlValue::Null), Value::NULL);
        assert_eq!(sql_value_to_mysql(&SqlValue::Bool(true)), Value::Int(1));
        assert_eq!(sql_value_to_mysql(&SqlValue::I16(-3)), Value::Int(-3));
        assert_eq!(
            sql_value_to_mysql(&SqlValue::Text("héllo".into())),
            Value::Bytes("héllo".as_bytes().to_vec())
        );
        assert_eq!(
            sql_value_to_mysql(&SqlValue::Decimal(Decimal::from_str("12.50").unwrap())),
            Value::Bytes(b"12.50".to_vec())
        );
    }

    #[test]
    fn test_temporal_conversion() {
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_micro_opt(23, 59, 58, 125)
            .unwrap();
        assert_eq!(
            sql_value_to_mysql(&SqlValue::DateTime(dt)),
            Value::Date(2024, 2, 29, 23, 59, 58, 125)
        );

        let d = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert_eq!(
            sql_value_to_mysql(&SqlValue::Date(d)),
            Value::Date(1999, 12, 31, 0, 0, 0, 0)
        );

        let t = NaiveTime::from_hms_opt(8, 30, 0).unwrap();
        assert_eq!(
            sql_value_to_mysql(&SqlValue::Time(t)),
            Value::Time(false, 0, 8, 30, 0, 0)
        );
    }
}
