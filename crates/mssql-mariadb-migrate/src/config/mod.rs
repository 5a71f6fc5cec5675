//! Configuration loading and validation.
//!
//! A [`Config`] is built once at startup, either from a YAML file or from the
//! `REMOTEDB_*` / `LOCALDB_*` environment variables, and then passed by
//! reference to every component.

mod table_list;
mod types;
mod validation;

pub use table_list::{load_table_list, parse_table_list};
pub use types::*;

use crate::error::{MigrateError, Result};
use std::path::Path;
use std::str::FromStr;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first if present;
    /// variables already set in the environment take precedence.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            optional(key).ok_or_else(|| MigrateError::Config(format!("{} is not set", key)))
        };

        let source = SourceConfig {
            host: required("REMOTEDB_HOST")?,
            port: parse_or(optional("REMOTEDB_PORT"), "REMOTEDB_PORT", default_mssql_port())?,
            database: required("REMOTEDB_NAME")?,
            user: required("REMOTEDB_USER")?,
            password: optional("REMOTEDB_PASSWORD").unwrap_or_default(),
            schema: optional("REMOTEDB_SCHEMA").unwrap_or_else(default_dbo_schema),
            encrypt: parse_flag(optional("REMOTEDB_ENCRYPT"), "REMOTEDB_ENCRYPT", true)?,
            trust_server_cert: parse_flag(
                optional("REMOTEDB_TRUST_SERVER_CERT"),
                "REMOTEDB_TRUST_SERVER_CERT",
                true,
            )?,
        };

        let target = TargetConfig {
            host: required("LOCALDB_HOST")?,
            port: parse_or(optional("LOCALDB_PORT"), "LOCALDB_PORT", default_mariadb_port())?,
            database: required("LOCALDB_NAME")?,
            user: required("LOCALDB_USER")?,
            password: optional("LOCALDB_PASSWORD").unwrap_or_default(),
        };

        let migration = MigrationConfig {
            row_limit: parse_or(
                optional("MIGRATION_ROW_LIMIT"),
                "MIGRATION_ROW_LIMIT",
                default_row_limit(),
            )?,
            audit_table: optional("MIGRATION_AUDIT_TABLE").unwrap_or_else(default_audit_table),
            ..MigrationConfig::default()
        };

        let config = Config {
            source,
            target,
            migration,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| MigrateError::Config(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}

fn parse_flag(value: Option<String>, key: &str, default: bool) -> Result<bool> {
    match value {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" | "disable" => Ok(false),
            _ => Err(MigrateError::Config(format!(
                "{} must be true or false, got '{}'",
                key, raw
            ))),
        },
        None => Ok(default),
    }
}
