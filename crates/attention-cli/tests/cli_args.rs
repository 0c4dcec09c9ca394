//! Argument handling tests for the attention-gate binary.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]
#![allow(deprecated)] // cargo_bin deprecation

use assert_cmd::Command;
use predicates::prelude::*;

fn gate(workdir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("attention-gate").unwrap();
    cmd.current_dir(workdir).env("XDG_CONFIG_HOME", workdir);
    cmd
}

#[test]
fn test_no_arguments_is_usage_error() {
    let workdir = tempfile::tempdir().unwrap();

    gate(workdir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No frame directory specified"));
}

#[test]
fn test_watch_without_frames_is_usage_error() {
    let workdir = tempfile::tempdir().unwrap();

    gate(workdir.path())
        .arg("watch")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--frames"));
}

#[test]
fn test_threshold_out_of_range() {
    let workdir = tempfile::tempdir().unwrap();

    gate(workdir.path())
        .args(["--frames", ".", "--ear-threshold", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in 0.0..=1.0"));
}

#[test]
fn test_threshold_not_a_number() {
    let workdir = tempfile::tempdir().unwrap();

    gate(workdir.path())
        .args(["--frames", ".", "--ear-threshold", "wide"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid number"));
}

#[test]
fn test_refresh_rate_must_be_positive() {
    let workdir = tempfile::tempdir().unwrap();

    gate(workdir.path())
        .args(["--frames", ".", "--refresh-hz", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("positive rate"));
}

#[test]
fn test_zero_frame_limit_is_rejected() {
    let workdir = tempfile::tempdir().unwrap();

    gate(workdir.path())
        .args(["--frames", ".", "--max-frames", "0"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("frame limit must be at least 1"));
}

#[test]
fn test_help_lists_options() {
    let workdir = tempfile::tempdir().unwrap();

    gate(workdir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--until-attentive"))
        .stdout(predicate::str::contains("--ear-threshold"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version() {
    let workdir = tempfile::tempdir().unwrap();

    gate(workdir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
