//! Error taxonomy for the detection loop.

use thiserror::Error;

/// Errors surfaced by a detection session.
///
/// `CameraUnavailable` and `ModelLoadFailed` end the session. The remaining
/// variants are recovered per frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    /// No camera could be acquired or its surface never became ready.
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    /// The landmark model failed to load.
    #[error("face detection failed to load: {0}")]
    ModelLoadFailed(String),

    /// Eye landmarks have zero horizontal span.
    #[error("degenerate eye geometry: outer and inner eye corners coincide")]
    DegenerateGeometry,

    /// The landmark provider failed on a single frame.
    #[error("inference failed for frame: {0}")]
    TransientInference(String),

    /// The landmark provider returned the wrong number of eye points.
    #[error("landmark provider returned {actual} eye points, expected {expected}")]
    InvalidLandmarks {
        /// Required point count.
        expected: usize,
        /// Count actually returned.
        actual: usize,
    },
}

impl DetectionError {
    /// Returns true if this error ends the session.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::CameraUnavailable(_) | Self::ModelLoadFailed(_))
    }
}

/// Malformed input rejected synchronously by `Detector::start`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StartError {
    /// The render target is not attached to any display surface.
    #[error("render target is required but not attached")]
    TargetDetached,

    /// The EAR threshold is not a finite value in 0.0..=1.0.
    #[error("ear threshold must be in 0.0..=1.0, got {0}")]
    InvalidThreshold(f32),

    /// The requested resolution has a zero dimension.
    #[error("camera constraints must request a non-zero resolution")]
    InvalidConstraints,

    /// The session worker thread could not be created.
    #[error("failed to spawn detection worker: {0}")]
    WorkerSpawn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(DetectionError::CameraUnavailable("denied".into()).is_fatal());
        assert!(DetectionError::ModelLoadFailed("offline".into()).is_fatal());
        assert!(!DetectionError::DegenerateGeometry.is_fatal());
        assert!(!DetectionError::TransientInference("decode".into()).is_fatal());
    }

    #[test]
    fn test_messages_are_descriptive() {
        let err = DetectionError::InvalidLandmarks {
            expected: 6,
            actual: 5,
        };
        assert_eq!(
            err.to_string(),
            "landmark provider returned 5 eye points, expected 6"
        );
        assert!(DetectionError::ModelLoadFailed("network".into())
            .to_string()
            .contains("network"));
    }
}
