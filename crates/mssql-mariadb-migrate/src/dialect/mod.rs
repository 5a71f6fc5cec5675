//! MariaDB dialect: type mapping and DDL generation.
//!
//! - [`typemap`]: MSSQL column types to MariaDB type expressions
//! - [`ddl`]: `CREATE TABLE IF NOT EXISTS` statements from mapped columns
//!
//! ```rust
//! use mssql_mariadb_migrate::core::ColumnDescriptor;
//! use mssql_mariadb_migrate::dialect::{build_create_table, map_column};
//!
//! let cols = vec![map_column(&ColumnDescriptor::new("id", "int").not_null())];
//! let ddl = build_create_table("orders", &cols);
//! assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS `orders`"));
//! ```

mod ddl;
mod typemap;

pub use ddl::{build_create_table, column_definition, quote_ident, TABLE_CHARSET, TABLE_ENGINE};
pub use typemap::{
    escape_comment, map_column, map_type, mssql_to_mariadb, TypeMapping,
    DEFAULT_DECIMAL_PRECISION, DEFAULT_VARCHAR_LENGTH,
};
