//! Camera source port.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::VideoFrame;

/// Which physical camera the session prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Front camera, facing the user.
    #[default]
    User,
    /// Rear camera.
    Environment,
}

/// Desired capture parameters. Sources should honor them where possible but
/// are not required to deliver the exact resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConstraints {
    /// Requested frame width.
    pub width: u32,
    /// Requested frame height.
    pub height: u32,
    /// Preferred camera.
    pub facing: Facing,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            facing: Facing::User,
        }
    }
}

/// Why a camera stream could not be acquired.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// The user or platform refused camera access.
    #[error("camera permission denied")]
    PermissionDenied,
    /// No matching capture device exists.
    #[error("no camera device available: {0}")]
    NoDevice(String),
    /// This session already holds a live camera handle.
    #[error("a camera handle is already active for this session")]
    AlreadyActive,
    /// Any other acquisition failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A live capture stream.
///
/// Implementations must stop every underlying track in [`stop_tracks`]
/// and report the remaining count through [`live_tracks`].
///
/// [`stop_tracks`]: VideoStream::stop_tracks
/// [`live_tracks`]: VideoStream::live_tracks
pub trait VideoStream: Send {
    /// Describes the stream for logs.
    fn label(&self) -> String;

    /// Returns the negotiated frame size once the stream has metadata.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Returns the current frame, or `None` if no frame is available.
    fn next_frame(&mut self) -> Option<VideoFrame>;

    /// Stops all capture tracks. Must be safe to call repeatedly.
    fn stop_tracks(&mut self);

    /// Number of tracks still capturing.
    fn live_tracks(&self) -> usize;
}

/// A stream shared between the camera handle and the render target it is bound to.
pub type SharedStream = Arc<Mutex<Box<dyn VideoStream>>>;

/// Port for acquiring live camera streams.
pub trait CameraSource: Send + Sync {
    /// Requests a stream matching `constraints`.
    ///
    /// # Errors
    ///
    /// Returns an error if no device grants access.
    fn request_stream(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn VideoStream>, AcquisitionError>;
}
