// file: tests/cli_test.rs
// version: 1.0.0
// guid: c41e8b27-6f09-4a3d-92b5-0d7f1e6ac384

//! Command line surface of the binary

use assert_cmd::Command;
use predicates::prelude::*;

fn bin() -> Command {
    Command::cargo_bin("devhost-provisioner").unwrap()
}

#[test]
fn test_help_exits_zero() {
    bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--production"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_version_exits_zero() {
    bin()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_flag_exits_one() {
    bin()
        .arg("--bogus")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--bogus"));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    bin().args(["--verbose", "--quiet"]).assert().code(1);
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.yaml");

    bin()
        .arg("--config")
        .arg(&missing)
        .arg("--quiet")
        .env_remove("DEVHOST_CONFIG")
        .assert()
        .code(1);
}
