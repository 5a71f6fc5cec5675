//! Database driver implementations.
//!
//! - [`mssql`]: Microsoft SQL Server source reader (Tiberius)
//! - [`mariadb`]: MariaDB target writer (mysql_async)
//!
//! Each driver holds a single long-lived connection for the duration of a
//! run. Calls are optionally bounded by a deadline, see [`with_deadline`].

pub mod mariadb;
pub mod mssql;

pub use mariadb::MariaDbWriter;
pub use mssql::MssqlReader;

use std::future::Future;
use std::time::Duration;

use crate::error::{MigrateError, Result};

/// Await `fut`, failing with [`MigrateError::Timeout`] once `deadline` elapses.
///
/// With no deadline the future is awaited as is.
pub async fn with_deadline<T, F>(deadline: Option<Duration>, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| MigrateError::Timeout {
                operation: operation.to_string(),
                seconds: limit.as_secs(),
            })?,
        None => fut.await,
    }
}
