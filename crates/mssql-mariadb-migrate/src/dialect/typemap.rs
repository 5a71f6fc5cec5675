//! MSSQL to MariaDB type mapping.
//!
//! The mapping is a closed lookup table. Types outside it are widened to
//! `TEXT` so that schema creation always succeeds; such fallbacks are
//! reported as lossy so callers can log them.

use tracing::warn;

use crate::core::{ColumnDescriptor, MappedColumn};

/// Length used for character types declared without one.
pub const DEFAULT_VARCHAR_LENGTH: i32 = 255;

/// Precision used for decimal types declared without one.
pub const DEFAULT_DECIMAL_PRECISION: i32 = 10;

/// Result of mapping a type from source to target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// Target type string (e.g., "VARCHAR(255)", "BIGINT").
    pub target_type: String,
    /// Whether this mapping loses type information.
    pub is_lossy: bool,
    /// Warning message for lossy mappings.
    pub warning: Option<String>,
}

impl TypeMapping {
    /// Create a lossless type mapping.
    pub fn lossless(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: false,
            warning: None,
        }
    }

    /// Create a lossy type mapping with a warning.
    pub fn lossy(target_type: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: true,
            warning: Some(warning.into()),
        }
    }
}

/// Map an MSSQL data type to a MariaDB type expression.
///
/// Matching on `mssql_type` is case-insensitive.
pub fn mssql_to_mariadb(
    mssql_type: &str,
    max_length: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
) -> TypeMapping {
    match mssql_type.trim().to_lowercase().as_str() {
        "int" => TypeMapping::lossless("INT"),
        "bigint" => TypeMapping::lossless("BIGINT"),
        "bit" | "boolean" => TypeMapping::lossless("BOOLEAN"),

        "varchar" | "nvarchar" | "char" | "nchar" => match max_length {
            // (n)varchar(MAX)
            Some(len) if len < 0 => TypeMapping::lossless("TEXT"),
            Some(len) if len > 0 => TypeMapping::lossless(format!("VARCHAR({})", len)),
            _ => TypeMapping::lossless(format!("VARCHAR({})", DEFAULT_VARCHAR_LENGTH)),
        },
        "text" | "ntext" => TypeMapping::lossless("TEXT"),

        "datetime" | "smalldatetime" => TypeMapping::lossless("DATETIME"),
        "date" => TypeMapping::lossless("DATE"),
        "time" => TypeMapping::lossless("TIME"),

        "decimal" | "numeric" => {
            let p = precision
                .filter(|p| *p > 0)
                .unwrap_or(DEFAULT_DECIMAL_PRECISION);
            let s = scale.filter(|s| *s > 0).unwrap_or(0);
            TypeMapping::lossless(format!("DECIMAL({},{})", p, s))
        }
        "float" | "real" => TypeMapping::lossless("FLOAT"),
        "money" => TypeMapping::lossless("DECIMAL(19,4)"),

        _ => TypeMapping::lossy(
            "TEXT",
            format!("unmapped source type '{}' stored as TEXT", mssql_type),
        ),
    }
}

/// Map an MSSQL data type to a MariaDB type expression string.
pub fn map_type(
    mssql_type: &str,
    max_length: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
) -> String {
    mssql_to_mariadb(mssql_type, max_length, precision, scale).target_type
}

/// Translate a source column into target column clauses.
pub fn map_column(col: &ColumnDescriptor) -> MappedColumn {
    let mapping = mssql_to_mariadb(&col.data_type, col.max_length, col.precision, col.scale);
    if let Some(warning) = &mapping.warning {
        warn!("Column {}: {}", col.name, warning);
    }

    MappedColumn {
        name: col.name.clone(),
        target_type: mapping.target_type,
        nullability: if col.is_nullable { "NULL" } else { "NOT NULL" },
        comment: col
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(|d| format!("COMMENT '{}'", escape_comment(d))),
    }
}

/// Backslash-escape single quotes for a MariaDB string literal.
pub fn escape_comment(text: &str) -> String {
    text.replace('\'', "\\'")
}
