//! Integration tests for directory replay: frames, sidecar landmarks, and a
//! full detection session over both.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use attention_adapters::{sidecar_provider, DirectoryCamera, SidecarLandmarkModel};
use attention_core::ports::{
    AcquisitionError, CameraConstraints, CameraSource, Detection, LandmarkProvider, VideoStream,
};
use attention_core::{Detector, FrameSurface, LandmarkModel, RefreshClock, VideoFrame};
use attention_test_support::{LandmarkBuilder, RecordingSink};
use image::{Rgb, RgbImage};

fn write_frame(dir: &Path, name: &str, shade: u8) {
    RgbImage::from_pixel(16, 12, Rgb([shade, shade, shade]))
        .save(dir.join(name))
        .unwrap();
}

fn write_sidecar(dir: &Path, stem: &str, left_ear: f32, right_ear: f32) {
    let face = LandmarkBuilder::face(left_ear, right_ear);
    std::fs::write(
        dir.join(format!("{stem}.landmarks.json")),
        serde_json::to_string(&face).unwrap(),
    )
    .unwrap();
}

fn recording() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "frame-002.png", 20);
    write_frame(dir.path(), "frame-001.png", 10);
    write_frame(dir.path(), "frame-003.png", 30);
    std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();
    dir
}

// === DirectoryCamera ===

#[test]
fn test_frames_play_in_name_order() {
    let dir = recording();
    let camera = DirectoryCamera::new(dir.path());
    assert_eq!(camera.frame_count().unwrap(), 3);

    let mut stream = camera
        .request_stream(&CameraConstraints::default())
        .unwrap();
    assert_eq!(stream.dimensions(), Some((16, 12)));
    assert_eq!(stream.live_tracks(), 1);

    let sources: Vec<String> = std::iter::from_fn(|| stream.next_frame())
        .map(|f| f.source)
        .collect();
    assert_eq!(sources.len(), 3);
    assert!(sources[0].ends_with("frame-001.png"));
    assert!(sources[2].ends_with("frame-003.png"));
    assert!(camera.is_exhausted());
}

#[test]
fn test_looping_restarts() {
    let dir = recording();
    let camera = DirectoryCamera::new(dir.path()).with_looping(true);
    let mut stream = camera
        .request_stream(&CameraConstraints::default())
        .unwrap();

    let frames: Vec<VideoFrame> = (0..5).filter_map(|_| stream.next_frame()).collect();
    assert_eq!(frames.len(), 5);
    assert!(frames[3].source.ends_with("frame-001.png"));
    assert_eq!(frames[4].sequence, 4);
    assert!(!camera.is_exhausted());
}

#[test]
fn test_stop_tracks_ends_stream() {
    let dir = recording();
    let camera = DirectoryCamera::new(dir.path());
    let mut stream = camera
        .request_stream(&CameraConstraints::default())
        .unwrap();

    stream.stop_tracks();
    stream.stop_tracks();
    assert_eq!(stream.live_tracks(), 0);
    assert!(stream.next_frame().is_none());
}

#[test]
fn test_empty_directory_is_no_device() {
    let dir = tempfile::tempdir().unwrap();
    let err = DirectoryCamera::new(dir.path())
        .request_stream(&CameraConstraints::default())
        .err()
        .unwrap();
    assert!(matches!(err, AcquisitionError::NoDevice(_)));
}

#[test]
fn test_unreadable_frames_are_skipped() {
    let dir = recording();
    std::fs::write(dir.path().join("frame-000.png"), b"truncated").unwrap();
    let camera = DirectoryCamera::new(dir.path());

    // The header of the first file cannot be read.
    assert!(camera
        .request_stream(&CameraConstraints::default())
        .is_err());

    std::fs::rename(
        dir.path().join("frame-000.png"),
        dir.path().join("frame-004.png"),
    )
    .unwrap();
    let mut stream = camera
        .request_stream(&CameraConstraints::default())
        .unwrap();
    let count = std::iter::from_fn(|| stream.next_frame()).count();
    assert_eq!(count, 3);
}

// === SidecarLandmarkModel ===

#[test]
fn test_sidecars_match_frames_by_stem() {
    let dir = recording();
    write_sidecar(dir.path(), "frame-001", 0.3, 0.3);
    std::fs::write(dir.path().join("frame-002.landmarks.json"), r#"{"face":null}"#).unwrap();

    let model = SidecarLandmarkModel::load(dir.path()).unwrap();
    assert_eq!(model.len(), 2);

    let frame = |name: &str| {
        VideoFrame::new(
            0,
            dir.path().join(name).display().to_string(),
            RgbImage::new(1, 1),
        )
    };
    assert!(matches!(
        model.detect(&frame("frame-001.png")).unwrap(),
        Detection::Detected(_)
    ));
    assert_eq!(
        model.detect(&frame("frame-002.png")).unwrap(),
        Detection::NotDetected
    );
    assert_eq!(
        model.detect(&frame("frame-003.png")).unwrap(),
        Detection::NotDetected
    );
}

#[test]
fn test_malformed_sidecar_fails_load() {
    let dir = recording();
    std::fs::write(dir.path().join("frame-001.landmarks.json"), "{ nope").unwrap();

    let provider = sidecar_provider(dir.path());
    let err = provider.load().unwrap_err();
    assert!(err.0.contains("frame-001.landmarks.json"));
    assert!(!provider.is_loaded());
}

#[test]
fn test_missing_landmark_directory_fails_load() {
    let provider = sidecar_provider("/nonexistent/attention-gate/landmarks");
    assert!(provider.load().unwrap_err().0.contains("does not exist"));
}

// === End to end ===

#[test]
fn test_session_over_recording() {
    let dir = recording();
    write_sidecar(dir.path(), "frame-001", 0.30, 0.30);
    write_sidecar(dir.path(), "frame-002", 0.10, 0.12);

    let camera = Arc::new(DirectoryCamera::new(dir.path()));
    let detector = Detector::new(camera.clone(), Arc::new(sidecar_provider(dir.path())))
        .with_clock(Arc::new(RefreshClock::new(200.0)));
    let sink = RecordingSink::new();
    let surface = Arc::new(FrameSurface::new("replay"));

    let session = detector.start(surface.clone(), sink.clone()).unwrap();
    assert!(sink.wait_for(3, Duration::from_secs(5)));
    for _ in 0..200 {
        if camera.is_exhausted() {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    session.stop();

    let frames = sink.frames();
    assert_eq!(frames.len(), 3);
    assert!(frames[0].face_detected && frames[0].eyes_open);
    assert!(frames[1].face_detected && !frames[1].eyes_open);
    assert!(!frames[2].face_detected);
    assert!(frames[2].error.is_none());
    assert!(camera.is_exhausted());
    assert!(!surface.is_bound());
}
