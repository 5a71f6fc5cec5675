//! # mssql-mariadb-migrate
//!
//! MSSQL to MariaDB schema translation and transactional table copy.
//!
//! This library provides:
//!
//! - **Type mapping** from MSSQL column metadata to MariaDB column definitions
//! - **Schema migration** with `CREATE TABLE IF NOT EXISTS`, including column comments
//! - **Data migration** of a bounded row set per table inside one transaction
//! - **Audit logging** of every table outcome, tagged with a server-derived run id
//!
//! ## Example
//!
//! ```rust,no_run
//! use mssql_mariadb_migrate::{load_table_list, Config, Orchestrator, TableSelection};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> mssql_mariadb_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let tables = load_table_list("tables.txt")?;
//!
//!     let orchestrator = Orchestrator::connect(config).await?;
//!     orchestrator
//!         .migrate_schema(TableSelection::Listed(tables.clone()), false)
//!         .await?;
//!     let result = orchestrator
//!         .migrate_data(&tables, &CancellationToken::new())
//!         .await?;
//!     orchestrator.close().await;
//!
//!     println!("Run {} copied {} rows", result.run_id, result.rows_transferred);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod schema;
pub mod state;
pub mod transfer;

// Re-exports for convenient access
pub use config::{load_table_list, Config, MigrationConfig, SourceConfig, TargetConfig};
pub use error::{MigrateError, Result};
pub use orchestrator::{HealthCheckResult, Orchestrator};
pub use schema::{SchemaMigrationResult, TableSelection};
pub use state::{AuditLogEntry, RunId, TableReport, TableStatus};
pub use transfer::{DataMigrationOptions, DataMigrationResult};
