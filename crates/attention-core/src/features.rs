//! Eye Aspect Ratio (EAR) feature extraction.
//!
//! EAR relates the two vertical eyelid openings to the horizontal eye width:
//!
//! ```text
//! EAR = (|p1 - p5| + |p2 - p4|) / (2 * |p0 - p3|)
//! ```
//!
//! Open eyes typically measure around 0.25 to 0.35, closed eyes approach zero.

use crate::domain::{DetectionError, EyeLandmarks};

/// Computes the Eye Aspect Ratio for one eye.
///
/// # Errors
///
/// Returns [`DetectionError::DegenerateGeometry`] when the outer and inner
/// corners coincide, or when the result is not finite.
pub fn compute_ear(eye: &EyeLandmarks) -> Result<f32, DetectionError> {
    let v1 = eye.point(1).distance(eye.point(5));
    let v2 = eye.point(2).distance(eye.point(4));
    let h = eye.point(0).distance(eye.point(3));

    if h == 0.0 || !h.is_finite() {
        return Err(DetectionError::DegenerateGeometry);
    }

    let ear = (v1 + v2) / (2.0 * h);
    if ear.is_finite() {
        Ok(ear)
    } else {
        Err(DetectionError::DegenerateGeometry)
    }
}
