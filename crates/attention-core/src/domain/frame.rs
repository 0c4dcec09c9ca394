//! Per-frame types: sampled video frames and emitted detection results.

use std::sync::Arc;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::Rect;

/// A frame sampled from the render target.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Monotonic sequence number within the stream.
    pub sequence: u64,
    /// Human-readable origin of the frame (device name or file path).
    pub source: String,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Decoded pixels.
    pub image: Arc<RgbImage>,
}

impl VideoFrame {
    /// Creates a frame from decoded pixels.
    #[must_use]
    pub fn new(sequence: u64, source: impl Into<String>, image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            sequence,
            source: source.into(),
            width,
            height,
            image: Arc::new(image),
        }
    }
}

/// One structured result per processed frame or per failure.
///
/// When `face_detected` is false the EAR fields are zero and `eyes_open` is
/// false. A populated `error` means detection could not be attempted, which
/// callers must keep distinct from "checked and found nothing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFrame {
    /// Whether a face was found in the frame.
    pub face_detected: bool,
    /// Whether the averaged EAR is above the threshold.
    pub eyes_open: bool,
    /// Left eye aspect ratio.
    #[serde(rename = "leftEAR")]
    pub left_ear: f32,
    /// Right eye aspect ratio.
    #[serde(rename = "rightEAR")]
    pub right_ear: f32,
    /// Mean of both eye aspect ratios.
    #[serde(rename = "avgEAR")]
    pub avg_ear: f32,
    /// Face bounding box, present only when a face was detected.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bounding_box: Option<Rect>,
    /// Why no valid signal could be produced.
    #[serde(default)]
    pub error: Option<String>,
}

impl DetectionFrame {
    /// A frame where detection ran and found no face.
    #[must_use]
    pub const fn no_signal() -> Self {
        Self {
            face_detected: false,
            eyes_open: false,
            left_ear: 0.0,
            right_ear: 0.0,
            avg_ear: 0.0,
            bounding_box: None,
            error: None,
        }
    }

    /// A no-signal frame carrying the reason detection could not be attempted.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::no_signal()
        }
    }

    /// A frame for a detected face.
    #[must_use]
    pub fn detected(left_ear: f32, right_ear: f32, eyes_open: bool, bounding_box: Rect) -> Self {
        Self {
            face_detected: true,
            eyes_open,
            left_ear,
            right_ear,
            avg_ear: (left_ear + right_ear) / 2.0,
            bounding_box: Some(bounding_box),
            error: None,
        }
    }

    /// Returns true if this frame reports a failure rather than a measurement.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_no_signal_is_zeroed() {
        let frame = DetectionFrame::no_signal();
        assert!(!frame.face_detected);
        assert!(!frame.eyes_open);
        assert_eq!(frame.avg_ear, 0.0);
        assert!(frame.error.is_none());
        assert!(!frame.is_error());
    }

    #[test]
    fn test_error_frame_is_distinguishable() {
        let frame = DetectionFrame::error("camera unavailable");
        assert!(!frame.face_detected);
        assert!(!frame.eyes_open);
        assert!(frame.is_error());
        assert_ne!(frame, DetectionFrame::no_signal());
    }

    #[test]
    fn test_detected_averages() {
        let frame = DetectionFrame::detected(0.2, 0.4, true, Rect::new(1.0, 2.0, 3.0, 4.0));
        assert!((frame.avg_ear - 0.3).abs() < 1e-6);
        assert!(frame.bounding_box.is_some());
    }

    #[test]
    fn test_serializes_with_camel_case_field_names() {
        let json = serde_json::to_value(DetectionFrame::no_signal()).unwrap();
        assert_eq!(json["faceDetected"], false);
        assert_eq!(json["eyesOpen"], false);
        assert_eq!(json["leftEAR"], 0.0);
        assert_eq!(json["rightEAR"], 0.0);
        assert_eq!(json["avgEAR"], 0.0);
        assert!(json["error"].is_null());
        assert!(json.get("boundingBox").is_none());
    }
}
