//! Test support utilities for attention-gate.
//!
//! Provides mocks for every core port, synthetic landmark builders with a
//! chosen Eye Aspect Ratio, and a manually driven frame clock.
//!
//! # Example
//!
//! ```
//! use attention_test_support::{LandmarkBuilder, MockLandmarkProvider};
//!
//! // A provider that reports wide open eyes, then closed eyes
//! let provider = MockLandmarkProvider::new().with_detections(vec![
//!     Ok(LandmarkBuilder::detection(0.30, 0.30)),
//!     Ok(LandmarkBuilder::detection(0.10, 0.10)),
//! ]);
//! ```

mod builders;
mod mocks;

pub use builders::{LandmarkBuilder, SyntheticFrame};
pub use mocks::{
    DetectGate, ManualClock, MockCameraSource, MockLandmarkProvider, MockRenderTarget, MockStream,
    Readiness, RecordingSink,
};
