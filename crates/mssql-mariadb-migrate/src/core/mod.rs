//! Core abstractions shared by the drivers and the migrators.
//!
//! - [`schema`]: column metadata before and after type mapping
//! - [`value`]: SQL values and source rows
//! - [`traits`]: the source reader and target writer seams

pub mod schema;
pub mod traits;
pub mod value;

#[cfg(test)]
pub(crate) mod mock;

pub use schema::{ColumnDescriptor, MappedColumn};
pub use traits::{SourceReader, TargetWriter};
pub use value::{Row, SqlValue};
