//! CLI integration tests for mssql-mariadb-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for error conditions that occur before any database work.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

/// Get a command for the mssql-mariadb-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("mssql-mariadb-migrate").unwrap()
}

fn write_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

/// A valid configuration pointing at ports nothing listens on.
fn unreachable_config() -> NamedTempFile {
    write_file(&[
        "source:",
        "  host: 127.0.0.1",
        "  port: 1",
        "  database: erp",
        "  user: sa",
        "  encrypt: false",
        "target:",
        "  host: 127.0.0.1",
        "  port: 1",
        "  database: erp",
        "  user: root",
        "migration:",
        "  operation_timeout_secs: 5",
    ])
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("schema"))
        .stdout(predicate::str::contains("data"))
        .stdout(predicate::str::contains("all"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_schema_subcommand_help() {
    cmd()
        .args(["schema", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("[TABLES]"));
}

#[test]
fn test_data_subcommand_help() {
    cmd()
        .args(["data", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--truncate"))
        .stdout(predicate::str::contains("--no-audit"))
        .stdout(predicate::str::contains("--row-limit"))
        .stdout(predicate::str::contains("<TABLES>"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mssql-mariadb-migrate"));
}

#[test]
fn test_global_flags_exist() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_data_requires_table_list() {
    cmd()
        .arg("data")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<TABLES>"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Exit Code Tests - Table List (Exit Code 1)
// =============================================================================

#[test]
fn test_missing_table_list_exits_with_code_1() {
    cmd()
        .args(["data", "no_such_tables.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found or unreadable"));
}

#[test]
fn test_table_list_without_names_exits_with_code_1() {
    let tables = write_file(&["# comment", "", "  ", "1_not_a_table", "-- another"]);

    cmd()
        .args(["all", tables.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("contains no table names"));
}

#[test]
fn test_table_list_checked_before_config() {
    // The config file does not exist, but the table list error wins.
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "data", "no_such_tables.txt"])
        .assert()
        .code(1);
}

// =============================================================================
// Exit Code Tests - Config Errors
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error (code 7), not config error (code 1)
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let config = write_file(&["invalid: yaml: content: ["]);

    cmd()
        .args(["--config", config.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_empty_config_exits_with_code_1() {
    let config = NamedTempFile::new().unwrap();

    cmd()
        .args(["--config", config.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_row_limit_in_config_exits_with_code_1() {
    let config = write_file(&[
        "source:",
        "  host: mssql",
        "  database: erp",
        "  user: sa",
        "target:",
        "  host: mariadb",
        "  database: erp",
        "  user: root",
        "migration:",
        "  row_limit: 0",
    ]);

    cmd()
        .args(["--config", config.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("row_limit"));
}

#[test]
fn test_row_limit_override_is_validated() {
    let config = unreachable_config();
    let tables = write_file(&["orders"]);

    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "data",
            tables.path().to_str().unwrap(),
            "--row-limit",
            "0",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("row_limit"));
}

#[test]
fn test_missing_environment_exits_with_code_1() {
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .current_dir(dir.path())
        .env_clear()
        .arg("health-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("REMOTEDB_HOST is not set"));
}

#[test]
fn test_environment_from_dotenv_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".env"),
        "REMOTEDB_HOST=127.0.0.1\nREMOTEDB_NAME=erp\nREMOTEDB_USER=sa\n\
         LOCALDB_HOST=127.0.0.1\nLOCALDB_NAME=erp\nLOCALDB_USER=root\n\
         MIGRATION_ROW_LIMIT=0\n",
    )
    .unwrap();

    // The .env file is picked up; its invalid row limit is then rejected.
    cmd()
        .current_dir(dir.path())
        .env_clear()
        .arg("health-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("row_limit"));
}

// =============================================================================
// Exit Code Tests - Connection Errors (Exit Code 2)
// =============================================================================

#[test]
fn test_unreachable_databases_exit_with_code_2() {
    let config = unreachable_config();

    cmd()
        .args(["--config", config.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("UNHEALTHY"));
}

#[test]
fn test_unreachable_source_fails_data_run_with_code_2() {
    let config = unreachable_config();
    let tables = write_file(&["orders"]);

    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "data",
            tables.path().to_str().unwrap(),
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("source"));
}
