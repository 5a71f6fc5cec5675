//! Error types for the migration library.

use thiserror::Error;

/// Exit code for configuration errors (bad config, missing table list).
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code when a database connection cannot be established.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Exit code when a setup-phase call exceeds its deadline.
pub const EXIT_TIMEOUT: u8 = 3;
/// Exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;
/// Exit code for an interrupted run.
pub const EXIT_CANCELLED: u8 = 130;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, unusable table list).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A source or target connection could not be established.
    #[error("Connection to {side} database failed: {message}")]
    Connection { side: String, message: String },

    /// Column metadata could not be read for a table.
    #[error("Catalog fetch failed for table {table}: {message}")]
    CatalogFetch { table: String, message: String },

    /// CREATE TABLE failed on the target.
    #[error("DDL execution failed for table {table}: {message}")]
    DdlExecution { table: String, message: String },

    /// The target table could not be truncated before the copy.
    #[error("Truncate failed for table {table}: {message}")]
    Truncate { table: String, message: String },

    /// Source rows could not be read, or came back in an inconsistent shape.
    #[error("Row fetch failed for table {table}: {message}")]
    RowFetch { table: String, message: String },

    /// A row insert (or the surrounding transaction) failed on the target.
    #[error("Insert failed for table {table}: {message}")]
    Insert { table: String, message: String },

    /// The audit log entry for a table could not be written.
    #[error("Audit log write failed for table {table}: {message}")]
    AuditWrite { table: String, message: String },

    /// A database call did not complete within the configured deadline.
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// A server returned a value the driver could not interpret.
    #[error("Unexpected server response: {0}")]
    Protocol(String),

    /// Source database query error
    #[error("Source database error: {0}")]
    Source(#[from] tiberius::error::Error),

    /// Target database query error
    #[error("Target database error: {0}")]
    Target(#[from] mysql_async::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Connection error for the given side ("source" or "target").
    pub fn connection(side: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::Connection {
            side: side.into(),
            message: message.to_string(),
        }
    }

    pub fn catalog_fetch(table: impl Into<String>, cause: impl ToString) -> Self {
        MigrateError::CatalogFetch {
            table: table.into(),
            message: cause.to_string(),
        }
    }

    pub fn ddl_execution(table: impl Into<String>, cause: impl ToString) -> Self {
        MigrateError::DdlExecution {
            table: table.into(),
            message: cause.to_string(),
        }
    }

    pub fn truncate(table: impl Into<String>, cause: impl ToString) -> Self {
        MigrateError::Truncate {
            table: table.into(),
            message: cause.to_string(),
        }
    }

    pub fn row_fetch(table: impl Into<String>, cause: impl ToString) -> Self {
        MigrateError::RowFetch {
            table: table.into(),
            message: cause.to_string(),
        }
    }

    pub fn insert(table: impl Into<String>, cause: impl ToString) -> Self {
        MigrateError::Insert {
            table: table.into(),
            message: cause.to_string(),
        }
    }

    pub fn audit_write(table: impl Into<String>, cause: impl ToString) -> Self {
        MigrateError::AuditWrite {
            table: table.into(),
            message: cause.to_string(),
        }
    }

    /// Whether this error aborts the whole run rather than a single table.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MigrateError::CatalogFetch { .. }
                | MigrateError::DdlExecution { .. }
                | MigrateError::Truncate { .. }
                | MigrateError::RowFetch { .. }
                | MigrateError::Insert { .. }
                | MigrateError::AuditWrite { .. }
        )
    }

    /// Process exit code for an error that reached the top-level handler.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => EXIT_CONFIG_ERROR,
            MigrateError::Connection { .. } => EXIT_CONNECTION_ERROR,
            MigrateError::Timeout { .. } => EXIT_TIMEOUT,
            MigrateError::Io(_) => EXIT_IO_ERROR,
            MigrateError::Cancelled => EXIT_CANCELLED,
            _ => EXIT_CONFIG_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
