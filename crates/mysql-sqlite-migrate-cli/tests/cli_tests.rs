//! CLI integration tests for mysql-sqlite-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for error conditions that occur before any database is
//! contacted.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the mysql-sqlite-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("mysql-sqlite-migrate").unwrap()
}

fn config_file(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", body).unwrap();
    file
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
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--source"))
        .stdout(predicate::str::contains("--tables"))
        .stdout(predicate::str::contains("--delete-existing-data"))
        .stdout(predicate::str::contains("--yes"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mysql-sqlite-migrate"));
}

#[test]
fn test_global_flags_and_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--no-progress"))
        .stdout(predicate::str::contains("[default: migrate.yaml]"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_unknown_source_value_is_rejected_by_parser() {
    cmd()
        .args(["run", "--source", "postgres"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_1() {
    // A missing file is an IO error, not a config error
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let file = config_file("invalid: yaml: content: [\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_required_fields_exits_with_code_2() {
    let file = config_file("sqlite:\n  file: out.db\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(2);
}

#[test]
fn test_invalid_source_exits_with_code_2() {
    let file = config_file(
        "mysql: { host: localhost, user: app, database: shop }\n\
         sqlite: { file: out.db }\n\
         options: { source: oracle }\n",
    );

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_existing_target_exits_with_code_3_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("shop.db");
    std::fs::write(&target, b"keep me").unwrap();

    // The MySQL host is unreachable; the guard must fire first.
    let file = config_file(&format!(
        "mysql: {{ host: 127.0.0.1, port: 1, user: app, database: shop }}\n\
         sqlite: {{ file: '{}' }}\n",
        target.display()
    ));

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(std::fs::read(&target).unwrap(), b"keep me");
}
