//! Eye-state classification.
//!
//! Each frame is classified on its own: both EARs are averaged and compared
//! against a fixed threshold with a strict `>`. There is no hysteresis and no
//! multi-frame debouncing, so one jittery frame can flip the result.

/// Default EAR threshold above which eyes count as open.
pub const DEFAULT_EAR_THRESHOLD: f32 = 0.22;

/// Returns true if the averaged EAR is strictly above `threshold`.
#[must_use]
pub fn classify(left_ear: f32, right_ear: f32, threshold: f32) -> bool {
    average(left_ear, right_ear) > threshold
}

/// Mean of both eye aspect ratios.
#[must_use]
pub fn average(left_ear: f32, right_ear: f32) -> f32 {
    (left_ear + right_ear) / 2.0
}
