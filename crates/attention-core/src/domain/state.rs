//! Session lifecycle state machine.

use std::fmt;

/// Why a session ended in [`LoopState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Camera could not be acquired or its surface never became ready.
    CameraUnavailable(String),
    /// The landmark model failed to load.
    ModelLoadFailed(String),
    /// Too many consecutive frames failed inference.
    InferenceFailed(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CameraUnavailable(msg) => write!(f, "camera unavailable: {msg}"),
            Self::ModelLoadFailed(msg) => write!(f, "model load failed: {msg}"),
            Self::InferenceFailed(msg) => write!(f, "inference failed: {msg}"),
        }
    }
}

/// Lifecycle of one detection session.
///
/// `Idle → AcquiringCamera → LoadingModel → Running → Stopped`, with
/// `Failed` reachable from the three active states. `Stopped` and `Failed`
/// are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Session created, nothing acquired yet.
    #[default]
    Idle,
    /// Waiting for the camera stream and its display surface.
    AcquiringCamera,
    /// Waiting for the landmark model.
    LoadingModel,
    /// Sampling frames.
    Running,
    /// Stopped by the caller.
    Stopped,
    /// Ended by a fatal error.
    Failed(FailureReason),
}

impl LoopState {
    /// Returns true for `Stopped` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed(_))
    }

    /// Returns true if the state machine permits moving to `next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::Stopped | Self::Failed(_), _) => false,
            (_, Self::Stopped) => true,
            (Self::Idle, Self::AcquiringCamera)
            | (Self::AcquiringCamera, Self::LoadingModel | Self::Running)
            | (Self::LoadingModel, Self::Running) => true,
            (Self::AcquiringCamera | Self::LoadingModel | Self::Running, Self::Failed(_)) => true,
            _ => false,
        }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AcquiringCamera => "acquiring_camera",
            Self::LoadingModel => "loading_model",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Failed(_) => "failed",
        }
    }
}
