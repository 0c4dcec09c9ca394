//! Attention Core - Eye-state attention detection loop
//!
//! This crate contains the domain types, the ports for external collaborators
//! (camera, render target, landmark provider, result sink), the Eye Aspect Ratio
//! feature extractor, the eye-state tracker, and the detection loop that ties
//! them together into a cancellable session.

pub mod detector;
pub mod domain;
pub mod features;
pub mod ports;
pub mod provider;
pub mod scheduler;
pub mod session;
pub mod surface;
pub mod tracker;

pub use detector::{DetectionSession, Detector, DetectorConfig};
pub use domain::{
    DetectionError, DetectionFrame, EyeLandmarks, FaceLandmarks, FailureReason, LoopState,
    Point2D, Rect, StartError, VideoFrame,
};
pub use features::compute_ear;
pub use ports::{
    AcquisitionError, CameraConstraints, CameraSource, Detection, Facing, FrameClock,
    LandmarkProvider, ModelLoadError, RefreshClock, RenderTarget, ResultSink, SharedStream,
    VideoStream,
};
pub use provider::{LandmarkModel, LazyLandmarkProvider};
pub use scheduler::CancellationToken;
pub use surface::FrameSurface;
pub use tracker::{classify, DEFAULT_EAR_THRESHOLD};
