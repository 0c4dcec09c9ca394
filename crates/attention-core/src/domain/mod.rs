//! Core domain types for attention detection.

mod error;
mod frame;
mod geometry;
mod state;

pub use error::{DetectionError, StartError};
pub use frame::{DetectionFrame, VideoFrame};
pub use geometry::{EyeLandmarks, FaceLandmarks, Point2D, Rect, EYE_LANDMARK_COUNT};
pub use state::{FailureReason, LoopState};
