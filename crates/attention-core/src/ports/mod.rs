//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the detection core and the
//! external collaborators it consumes: camera, display surface, landmark
//! model, frame clock, and the result observer.

mod camera;
mod clock;
mod landmarks;
mod render_target;
mod sink;

pub use camera::{
    AcquisitionError, CameraConstraints, CameraSource, Facing, SharedStream, VideoStream,
};
pub use clock::{FrameClock, RefreshClock};
pub use landmarks::{Detection, LandmarkProvider, ModelLoadError};
pub use render_target::{ReadySignal, RenderTarget};
pub use sink::ResultSink;
