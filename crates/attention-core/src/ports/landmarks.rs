//! Landmark provider port.

use thiserror::Error;

use crate::domain::{FaceLandmarks, VideoFrame};

/// Result of running the landmark model on one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// A face was found.
    Detected(FaceLandmarks),
    /// The model ran and found no face.
    NotDetected,
}

/// The landmark model could not be made ready.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ModelLoadError(pub String);

impl From<anyhow::Error> for ModelLoadError {
    fn from(err: anyhow::Error) -> Self {
        Self(format!("{err:#}"))
    }
}

/// Port for the external face landmark model.
///
/// Loading is process-wide and idempotent: once `load` succeeds every
/// session sharing the provider sees it as loaded.
pub trait LandmarkProvider: Send + Sync {
    /// Loads the model if it is not loaded yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is unavailable.
    fn load(&self) -> Result<(), ModelLoadError>;

    /// Returns true once `load` has succeeded.
    fn is_loaded(&self) -> bool;

    /// Runs detection on one frame. May block for the duration of inference.
    ///
    /// # Errors
    ///
    /// Returns an error for a failure confined to this frame.
    fn detect(&self, frame: &VideoFrame) -> anyhow::Result<Detection>;
}
