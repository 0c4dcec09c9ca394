//! Render target port.

use crossbeam_channel::Receiver;

use super::SharedStream;
use crate::domain::VideoFrame;

/// Readiness notification for a bound stream: `Ok` once the surface can be
/// sampled, `Err` with a reason if it never will be.
pub type ReadySignal = Receiver<Result<(), String>>;

/// A display surface the core binds the camera stream to and samples from.
pub trait RenderTarget: Send + Sync {
    /// Returns false if the target is not attached to any surface.
    fn is_attached(&self) -> bool;

    /// Binds a stream and returns the channel that reports readiness.
    fn bind(&self, stream: SharedStream) -> ReadySignal;

    /// Samples the frame currently shown by the surface.
    fn sample(&self) -> Option<VideoFrame>;

    /// Detaches any bound stream. Must be safe to call repeatedly.
    fn unbind(&self);
}
