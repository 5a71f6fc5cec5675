//! Microsoft SQL Server source driver.
//!
//! Provides [`MssqlReader`], which reads catalog metadata (including
//! `MS_Description` column descriptions) and bounded row samples over a
//! single Tiberius connection.

mod reader;

pub use reader::MssqlReader;
