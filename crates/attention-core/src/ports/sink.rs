//! Result sink port.

use crate::domain::DetectionFrame;

/// Observer receiving one [`DetectionFrame`] per processed frame or failure.
///
/// Frames arrive in sampling order, one at a time, on the session's worker
/// thread.
pub trait ResultSink: Send + Sync {
    /// Called for every emitted frame.
    fn on_frame(&self, frame: DetectionFrame);
}

impl<F> ResultSink for F
where
    F: Fn(DetectionFrame) + Send + Sync,
{
    fn on_frame(&self, frame: DetectionFrame) {
        self(frame);
    }
}
