//! End-to-end tests for the watch command over recorded frames.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]
#![allow(deprecated)] // cargo_bin deprecation

use std::path::Path;

use assert_cmd::Command;
use attention_test_support::LandmarkBuilder;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use serde_json::Value;

/// One recorded frame: file stem and the eye ratios annotated for it
/// (`None` for a frame without a face).
type Shot = (&'static str, Option<(f32, f32)>);

/// Writes frames and their sidecar annotations into `dir`.
fn record(dir: &Path, shots: &[Shot]) {
    for (stem, ears) in shots {
        RgbImage::from_pixel(32, 24, Rgb([90, 90, 90]))
            .save(dir.join(format!("{stem}.png")))
            .unwrap();
        let sidecar = match ears {
            Some((left, right)) => {
                serde_json::to_string(&LandmarkBuilder::face(*left, *right)).unwrap()
            }
            None => r#"{"face":null}"#.to_string(),
        };
        std::fs::write(dir.join(format!("{stem}.landmarks.json")), sidecar).unwrap();
    }
}

fn recording(shots: &[Shot]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    record(dir.path(), shots);
    dir
}

fn gate(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("attention-gate").unwrap();
    cmd.current_dir(workdir).env("XDG_CONFIG_HOME", workdir);
    cmd
}

fn frames(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// === Replay ===

#[test]
fn test_replays_every_frame() {
    let rec = recording(&[
        ("001", Some((0.30, 0.30))),
        ("002", Some((0.10, 0.10))),
        ("003", None),
    ]);

    let output = gate(rec.path())
        .arg("--frames")
        .arg(rec.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let frames = frames(&output.stdout);
    assert_eq!(frames.len(), 3);

    assert_eq!(frames[0]["faceDetected"], true);
    assert_eq!(frames[0]["eyesOpen"], true);
    assert!(frames[0]["boundingBox"].is_object());

    assert_eq!(frames[1]["faceDetected"], true);
    assert_eq!(frames[1]["eyesOpen"], false);

    assert_eq!(frames[2]["faceDetected"], false);
    assert_eq!(frames[2]["avgEAR"], 0.0);
    assert!(frames[2]["error"].is_null());
}

#[test]
fn test_watch_subcommand_matches_default() {
    let rec = recording(&[("001", Some((0.30, 0.30)))]);

    let output = gate(rec.path())
        .arg("watch")
        .arg("--frames")
        .arg(rec.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(frames(&output.stdout).len(), 1);
}

#[test]
fn test_separate_landmark_directory() {
    let frames_dir = tempfile::tempdir().unwrap();
    let landmarks_dir = tempfile::tempdir().unwrap();
    record(frames_dir.path(), &[("001", Some((0.30, 0.30)))]);
    std::fs::rename(
        frames_dir.path().join("001.landmarks.json"),
        landmarks_dir.path().join("001.landmarks.json"),
    )
    .unwrap();

    let output = gate(frames_dir.path())
        .arg("--frames")
        .arg(frames_dir.path())
        .arg("--landmarks")
        .arg(landmarks_dir.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(frames(&output.stdout)[0]["eyesOpen"], true);
}

// === Round gate ===

#[test]
fn test_until_attentive_stops_at_open_eyes() {
    let rec = recording(&[
        ("001", Some((0.10, 0.10))),
        ("002", Some((0.32, 0.28))),
        ("003", Some((0.10, 0.10))),
        ("004", Some((0.10, 0.10))),
    ]);

    let output = gate(rec.path())
        .arg("--frames")
        .arg(rec.path())
        .arg("--until-attentive")
        .arg("--refresh-hz")
        .arg("10")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let frames = frames(&output.stdout);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["eyesOpen"], false);
    assert_eq!(frames[1]["eyesOpen"], true);
}

#[test]
fn test_never_attentive_exits_one() {
    let rec = recording(&[("001", Some((0.10, 0.10))), ("002", None)]);

    gate(rec.path())
        .arg("--frames")
        .arg(rec.path())
        .arg("--until-attentive")
        .assert()
        .code(1);
}

#[test]
fn test_threshold_flag_changes_verdict() {
    let rec = recording(&[("001", Some((0.25, 0.25)))]);

    gate(rec.path())
        .arg("--frames")
        .arg(rec.path())
        .arg("--until-attentive")
        .arg("--ear-threshold")
        .arg("0.3")
        .assert()
        .code(1);

    gate(rec.path())
        .arg("--frames")
        .arg(rec.path())
        .arg("--until-attentive")
        .arg("--ear-threshold")
        .arg("0.2")
        .assert()
        .code(0);
}

// === Stop conditions ===

#[test]
fn test_max_frames_with_loop() {
    let rec = recording(&[("001", None), ("002", None)]);

    let output = gate(rec.path())
        .arg("--frames")
        .arg(rec.path())
        .arg("--loop")
        .arg("--max-frames")
        .arg("5")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(frames(&output.stdout).len(), 5);
}

#[test]
fn test_frame_limit_holds_at_high_rates() {
    let rec = recording(&[("001", None), ("002", None)]);

    for _ in 0..20 {
        let output = gate(rec.path())
            .arg("--frames")
            .arg(rec.path())
            .arg("--loop")
            .arg("--max-frames")
            .arg("3")
            .arg("--refresh-hz")
            .arg("100000")
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(0));
        assert_eq!(frames(&output.stdout).len(), 3);
    }
}

#[test]
fn test_until_attentive_prints_nothing_after_open_eyes() {
    let rec = recording(&[("001", Some((0.32, 0.32))), ("002", Some((0.10, 0.10)))]);

    for _ in 0..10 {
        let output = gate(rec.path())
            .arg("--frames")
            .arg(rec.path())
            .arg("--loop")
            .arg("--until-attentive")
            .arg("--refresh-hz")
            .arg("100000")
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(0));
        let frames = frames(&output.stdout);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["eyesOpen"], true);
    }
}

#[test]
fn test_timeout_bounds_looping_session() {
    let rec = recording(&[("001", Some((0.10, 0.10)))]);

    gate(rec.path())
        .arg("--frames")
        .arg(rec.path())
        .arg("--loop")
        .arg("--until-attentive")
        .arg("--timeout-secs")
        .arg("1")
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .code(1);
}

// === Fatal errors ===

#[test]
fn test_missing_frame_directory_is_fatal() {
    let workdir = tempfile::tempdir().unwrap();

    let output = gate(workdir.path())
        .arg("--frames")
        .arg(workdir.path().join("missing"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let frames = frames(&output.stdout);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["faceDetected"], false);
    assert!(frames[0]["error"]
        .as_str()
        .unwrap()
        .contains("camera unavailable"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn test_malformed_landmarks_are_fatal() {
    let rec = recording(&[("001", Some((0.30, 0.30)))]);
    std::fs::write(rec.path().join("001.landmarks.json"), "{ not json").unwrap();

    let output = gate(rec.path())
        .arg("--frames")
        .arg(rec.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let frames = frames(&output.stdout);
    assert_eq!(frames.len(), 1);
    assert!(frames[0]["error"]
        .as_str()
        .unwrap()
        .contains("face detection failed to load"));
}

#[test]
fn test_bad_landmark_count_is_reported_per_frame() {
    let rec = recording(&[("001", Some((0.30, 0.30))), ("002", Some((0.30, 0.30)))]);
    let mut face = LandmarkBuilder::face(0.3, 0.3);
    face.left_eye.truncate(4);
    std::fs::write(
        rec.path().join("001.landmarks.json"),
        serde_json::to_string(&face).unwrap(),
    )
    .unwrap();

    let output = gate(rec.path())
        .arg("--frames")
        .arg(rec.path())
        .arg("-v")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let frames = frames(&output.stdout);
    assert_eq!(frames.len(), 2);
    assert!(frames[0]["error"]
        .as_str()
        .unwrap()
        .contains("4 eye points"));
    assert_eq!(frames[1]["eyesOpen"], true);
}

#[test]
fn test_pretty_output() {
    let rec = recording(&[("001", None)]);

    gate(rec.path())
        .arg("--frames")
        .arg(rec.path())
        .arg("--pretty")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("\n  \"faceDetected\": false"));
}
