//! MSSQL source reader implementation.
//!
//! Implements the `SourceReader` trait on top of a single Tiberius client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql, Query};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::core::{ColumnDescriptor, Row, SourceReader, SqlValue};
use crate::drivers::with_deadline;
use crate::error::{MigrateError, Result};

type MssqlClient = Client<Compat<TcpStream>>;

const LIST_TABLES_QUERY: &str = r#"
    SELECT TABLE_NAME
    FROM INFORMATION_SCHEMA.TABLES
    WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_SCHEMA = @P1
    ORDER BY TABLE_NAME
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        c.COLUMN_NAME,
        c.DATA_TYPE,
        CAST(c.CHARACTER_MAXIMUM_LENGTH AS INT),
        CAST(c.NUMERIC_PRECISION AS INT),
        CAST(c.NUMERIC_SCALE AS INT),
        c.IS_NULLABLE,
        CAST(ep.value AS NVARCHAR(4000))
    FROM INFORMATION_SCHEMA.COLUMNS c
    LEFT JOIN sys.columns sc
        ON sc.object_id = OBJECT_ID(QUOTENAME(c.TABLE_SCHEMA) + '.' + QUOTENAME(c.TABLE_NAME))
        AND sc.name = c.COLUMN_NAME
    LEFT JOIN sys.extended_properties ep
        ON ep.class = 1
        AND ep.major_id = sc.object_id
        AND ep.minor_id = sc.column_id
        AND ep.name = 'MS_Description'
    WHERE c.TABLE_SCHEMA = @P1 AND c.TABLE_NAME = @P2
    ORDER BY c.ORDINAL_POSITION
"#;

/// MSSQL source reader over one long-lived connection.
pub struct MssqlReader {
    client: Mutex<Option<MssqlClient>>,
    schema: String,
    timeout: Option<Duration>,
}

impl MssqlReader {
    /// Connect to the source database.
    pub async fn connect(config: &SourceConfig, timeout: Option<Duration>) -> Result<Self> {
        let tiberius_config = build_config(config);
        let addr = tiberius_config.get_addr();

        let client = with_deadline(timeout, "connecting to MSSQL source", async {
            let tcp = TcpStream::connect(addr)
                .await
                .map_err(|e| MigrateError::connection("source", e))?;
            tcp.set_nodelay(true).ok();

            Client::connect(tiberius_config, tcp.compat_write())
                .await
                .map_err(|e| MigrateError::connection("source", e))
        })
        .await?;

        info!(
            "Connected to MSSQL: {}:{}/{} (schema={}, encrypt={})",
            config.host, config.port, config.database, config.schema, config.encrypt
        );

        Ok(Self {
            client: Mutex::new(Some(client)),
            schema: config.schema.clone(),
            timeout,
        })
    }

    /// Quote an MSSQL identifier.
    fn quote_ident(name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn qualify_table(&self, table: &str) -> String {
        format!("{}.{}", Self::quote_ident(&self.schema), Self::quote_ident(table))
    }
}

fn build_config(source: &SourceConfig) -> Config {
    let mut config = Config::new();
    config.host(&source.host);
    config.port(source.port);
    config.database(&source.database);
    config.authentication(AuthMethod::sql_server(&source.user, &source.password));

    if source.encrypt {
        if source.trust_server_cert {
            config.trust_cert();
        }
        config.encryption(EncryptionLevel::Required);
    } else {
        config.encryption(EncryptionLevel::NotSupported);
    }

    config
}

fn active<'g>(guard: &'g mut MutexGuard<'_, Option<MssqlClient>>) -> Result<&'g mut MssqlClient> {
    guard
        .as_mut()
        .ok_or_else(|| MigrateError::connection("source", "connection already closed"))
}

#[async_trait]
impl SourceReader for MssqlReader {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut guard = self.client.lock().await;
        let client = active(&mut guard)?;

        let mut query = Query::new(LIST_TABLES_QUERY);
        query.bind(self.schema.as_str());

        let rows = with_deadline(self.timeout, "listing source tables", async {
            let stream = query.query(client).await?;
            Ok(stream.into_first_result().await?)
        })
        .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(name) = row.try_get::<&str, _>(0)? {
                tables.push(name.to_string());
            }
        }

        debug!("Found {} base tables in schema {}", tables.len(), self.schema);
        Ok(tables)
    }

    async fn fetch_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let mut guard = self.client.lock().await;
        let client = active(&mut guard)?;

        let mut query = Query::new(COLUMNS_QUERY);
        query.bind(self.schema.as_str());
        query.bind(table);

        let rows = with_deadline(self.timeout, "fetching column metadata", async {
            let stream = query.query(client).await?;
            Ok(stream.into_first_result().await?)
        })
        .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            columns.push(ColumnDescriptor {
                name: row.try_get::<&str, _>(0)?.unwrap_or_default().to_string(),
                data_type: row.try_get::<&str, _>(1)?.unwrap_or_default().to_string(),
                max_length: row.try_get::<i32, _>(2)?,
                precision: row.try_get::<i32, _>(3)?,
                scale: row.try_get::<i32, _>(4)?,
                is_nullable: row.try_get::<&str, _>(5)? == Some("YES"),
                description: row.try_get::<&str, _>(6)?.map(str::to_string),
            });
        }

        debug!("Loaded {} columns for {}", columns.len(), self.qualify_table(table));
        Ok(columns)
    }

    async fn fetch_rows(&self, table: &str, limit: usize) -> Result<Vec<Row>> {
        let mut guard = self.client.lock().await;
        let client = active(&mut guard)?;

        let sql = format!("SELECT TOP (@P1) * FROM {}", self.qualify_table(table));
        let mut query = Query::new(sql);
        query.bind(i64::try_from(limit).unwrap_or(i64::MAX));

        let rows = with_deadline(self.timeout, "fetching source rows", async {
            let stream = query.query(client).await?;
            Ok(stream.into_first_result().await?)
        })
        .await?;

        rows.into_iter().map(convert_row).collect()
    }

    fn db_type(&self) -> &str {
        "mssql"
    }

    async fn close(&self) {
        if let Some(client) = self.client.lock().await.take() {
            if let Err(e) = client.close().await {
                warn!("Error closing MSSQL connection: {}", e);
            }
        }
    }
}

/// Convert a Tiberius row into an owned row keyed by result-set column names.
fn convert_row(row: tiberius::Row) -> Result<Row> {
    let columns: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let values = row
        .into_iter()
        .map(|data| convert_value(&data))
        .collect::<Result<Vec<_>>>()?;
    Ok(Row::new(columns, values))
}

fn or_null<T>(value: Option<T>, f: impl FnOnce(T) -> SqlValue) -> SqlValue {
    value.map(f).unwrap_or(SqlValue::Null)
}

fn convert_value(data: &ColumnData<'static>) -> Result<SqlValue> {
    let value = match data {
        ColumnData::Bit(v) => or_null(*v, SqlValue::Bool),
        ColumnData::U8(v) => or_null(*v, |v| SqlValue::I16(i16::from(v))),
        ColumnData::I16(v) => or_null(*v, SqlValue::I16),
        ColumnData::I32(v) => or_null(*v, SqlValue::I32),
        ColumnData::I64(v) => or_null(*v, SqlValue::I64),
        ColumnData::F32(v) => or_null(*v, SqlValue::F32),
        ColumnData::F64(v) => or_null(*v, SqlValue::F64),
        ColumnData::String(v) => or_null(v.as_ref(), |s| SqlValue::Text(s.to_string())),
        ColumnData::Guid(v) => or_null(*v, SqlValue::Uuid),
        ColumnData::Binary(v) => or_null(v.as_ref(), |b| SqlValue::Bytes(b.to_vec())),
        ColumnData::Numeric(v) => or_null(*v, |n| {
            let text = n.to_string();
            text.parse::<Decimal>()
                .map(SqlValue::Decimal)
                .unwrap_or(SqlValue::Text(text))
        }),
        ColumnData::Xml(v) => or_null(v.as_ref(), |x| {
            SqlValue::Text(x.clone().into_owned().into_string())
        }),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            or_null(NaiveDateTime::from_sql(data)?, SqlValue::DateTime)
        }
        ColumnData::Date(_) => or_null(NaiveDate::from_sql(data)?, SqlValue::Date),
        ColumnData::Time(_) => or_null(NaiveTime::from_sql(data)?, SqlValue::Time),
        ColumnData::DateTimeOffset(_) => or_null(DateTime::<Utc>::from_sql(data)?, |dt| {
            SqlValue::DateTime(dt.naive_utc())
        }),
    };
    Ok(value)
}
