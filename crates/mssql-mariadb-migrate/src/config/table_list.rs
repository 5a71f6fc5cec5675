//! Table list input file.

use crate::error::{MigrateError, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Read the ordered list of table names to process.
///
/// A missing file, or one with no usable names, is a configuration error.
pub fn load_table_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        MigrateError::Config(format!("table list {} not found or unreadable: {}", path.display(), e))
    })?;

    let tables = parse_table_list(&content);
    if tables.is_empty() {
        return Err(MigrateError::Config(format!(
            "table list {} contains no table names",
            path.display()
        )));
    }
    Ok(tables)
}

/// Extract table names from file content.
///
/// Lines not starting with an alphabetic character are comments or blanks.
pub fn parse_table_list(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tables = Vec::new();

    for line in content.lines().map(str::trim) {
        if !line.chars().next().is_some_and(char::is_alphabetic) {
            continue;
        }
        if !seen.insert(line) {
            warn!("Table {} listed more than once, ignoring repeat", line);
            continue;
        }
        tables.push(line.to_string());
    }

    tables
}
