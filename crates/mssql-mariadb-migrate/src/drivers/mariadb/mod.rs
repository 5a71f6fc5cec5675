//! MariaDB target driver.
//!
//! Provides [`MariaDbWriter`], which runs DDL, row-at-a-time inserts inside
//! explicit transactions and audit log writes over a single mysql_async
//! connection.

mod writer;

pub use writer::MariaDbWriter;
