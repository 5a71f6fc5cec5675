//! Migration orchestrator - main workflow coordinator.
//!
//! Owns the two long-lived connections for a run and hands them to the
//! schema and data migrators. Connections are released by [`Orchestrator::close`]
//! after every table has been processed.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::{SourceReader, TargetWriter};
use crate::drivers::{MariaDbWriter, MssqlReader};
use crate::error::Result;
use crate::schema::{SchemaMigrationResult, SchemaMigrator, TableSelection};
use crate::transfer::{DataMigrationOptions, DataMigrationResult, DataMigrator};

/// Connectivity report for both databases.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    pub source_error: Option<String>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    pub target_error: Option<String>,

    /// Both sides reachable.
    pub healthy: bool,
}

impl HealthCheckResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    source: Arc<dyn SourceReader>,
    target: Arc<dyn TargetWriter>,
}

impl Orchestrator {
    /// Open the source connection, then the target connection.
    ///
    /// If the target cannot be reached the source connection is closed
    /// before the error is returned.
    pub async fn connect(config: Config) -> Result<Self> {
        let timeout = config.migration.operation_timeout();
        let source = MssqlReader::connect(&config.source, timeout).await?;

        let target = match MariaDbWriter::connect(
            &config.target,
            config.migration.audit_table.clone(),
            timeout,
        )
        .await
        {
            Ok(target) => target,
            Err(e) => {
                source.close().await;
                return Err(e);
            }
        };

        Ok(Self::with_connections(config, Arc::new(source), Arc::new(target)))
    }

    /// Build an orchestrator over already-open connections.
    pub fn with_connections(
        config: Config,
        source: Arc<dyn SourceReader>,
        target: Arc<dyn TargetWriter>,
    ) -> Self {
        Self {
            config,
            source,
            target,
        }
    }

    /// Create target tables for the selected source tables.
    pub async fn migrate_schema(
        &self,
        selection: TableSelection,
        dry_run: bool,
    ) -> Result<SchemaMigrationResult> {
        SchemaMigrator::new(self.source.as_ref(), self.target.as_ref())
            .dry_run(dry_run)
            .run(selection)
            .await
    }

    /// Copy rows for `tables` using the configured migration options.
    pub async fn migrate_data(
        &self,
        tables: &[String],
        cancel: &CancellationToken,
    ) -> Result<DataMigrationResult> {
        let options = DataMigrationOptions::from(&self.config.migration);
        DataMigrator::new(self.source.as_ref(), self.target.as_ref(), options)
            .run(tables, cancel)
            .await
    }

    /// Release both connections.
    pub async fn close(self) {
        self.source.close().await;
        self.target.close().await;
        info!("Closed {} and {} connections", self.source.db_type(), self.target.db_type());
    }

    /// Connect to each database independently and report reachability.
    pub async fn health_check(config: &Config) -> HealthCheckResult {
        let timeout = config.migration.operation_timeout();
        let mut result = HealthCheckResult::default();

        let started = Instant::now();
        match MssqlReader::connect(&config.source, timeout).await {
            Ok(source) => {
                result.source_latency_ms = started.elapsed().as_millis() as u64;
                result.source_connected = true;
                source.close().await;
            }
            Err(e) => {
                warn!("Source health check failed: {}", e);
                result.source_error = Some(e.to_string());
            }
        }

        let started = Instant::now();
        match MariaDbWriter::connect(&config.target, config.migration.audit_table.clone(), timeout)
            .await
        {
            Ok(target) => match target.server_timestamp().await {
                Ok(_) => {
                    result.target_latency_ms = started.elapsed().as_millis() as u64;
                    result.target_connected = true;
                    target.close().await;
                }
                Err(e) => {
                    warn!("Target health check failed: {}", e);
                    result.target_error = Some(e.to_string());
                    target.close().await;
                }
            },
            Err(e) => {
                warn!("Target health check failed: {}", e);
                result.target_error = Some(e.to_string());
            }
        }

        result.healthy = result.source_connected && result.target_connected;
        result
    }
}
