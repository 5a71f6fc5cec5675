//! Column metadata types.

use serde::{Deserialize, Serialize};

/// Column metadata as read from the source catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Source data type (e.g., "int", "nvarchar", "datetime").
    pub data_type: String,

    /// Maximum length for string types (-1 for MAX).
    pub max_length: Option<i32>,

    /// Numeric precision.
    pub precision: Option<i32>,

    /// Numeric scale.
    pub scale: Option<i32>,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Column description (MS_Description extended property).
    pub description: Option<String>,
}

impl ColumnDescriptor {
    /// Create a nullable column with no size information or description.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            max_length: None,
            precision: None,
            scale: None,
            is_nullable: true,
            description: None,
        }
    }

    pub fn with_length(mut self, max_length: i32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_precision(mut self, precision: i32, scale: i32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A column translated into target-dialect clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedColumn {
    /// Column name.
    pub name: String,

    /// Target type expression (e.g., "VARCHAR(50)").
    pub target_type: String,

    /// "NULL" or "NOT NULL".
    pub nullability: &'static str,

    /// `COMMENT '...'` clause with the description escaped, if any.
    pub comment: Option<String>,
}
