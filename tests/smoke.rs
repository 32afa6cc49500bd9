//! Smoke tests -- verify the binary runs and the CLI surface is intact.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("unitcheck")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("CI unit-test result pipeline"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("unitcheck")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("unitcheck"));
}

#[test]
fn test_run_subcommand_exists() {
    Command::cargo_bin("unitcheck")
        .unwrap()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("build configuration"));
}

#[test]
fn test_classify_subcommand_exists() {
    Command::cargo_bin("unitcheck")
        .unwrap()
        .args(["classify", "--help"])
        .assert()
        .success();
}

#[test]
fn test_classify_missing_log_reports_error_status() {
    Command::cargo_bin("unitcheck")
        .unwrap()
        .args(["classify", "/nonexistent/test_result.txt"])
        .assert()
        .success()
        .stdout(predicates::str::contains("error"))
        .stdout(predicates::str::contains("No output log"));
}
