//! Landmark geometry produced by the landmark provider.

use serde::{Deserialize, Serialize};

use super::DetectionError;

/// Number of landmark points describing one eye.
pub const EYE_LANDMARK_COUNT: usize = 6;

/// A 2-D landmark point in the provider's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Point2D {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned face bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Box width.
    pub width: f32,
    /// Box height.
    pub height: f32,
}

impl Rect {
    /// Creates a new rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Six landmark points of one eye, in fixed anatomical order.
///
/// | Index | Location     |
/// |-------|--------------|
/// | 0     | outer corner |
/// | 1     | upper-outer  |
/// | 2     | upper-inner  |
/// | 3     | inner corner |
/// | 4     | lower-inner  |
/// | 5     | lower-outer  |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeLandmarks([Point2D; EYE_LANDMARK_COUNT]);

impl EyeLandmarks {
    /// Creates eye landmarks from exactly six points.
    #[must_use]
    pub const fn new(points: [Point2D; EYE_LANDMARK_COUNT]) -> Self {
        Self(points)
    }

    /// Returns the point at the given anatomical index.
    #[must_use]
    pub const fn point(&self, index: usize) -> Point2D {
        self.0[index]
    }

    /// Returns all six points.
    #[must_use]
    pub const fn points(&self) -> &[Point2D; EYE_LANDMARK_COUNT] {
        &self.0
    }
}

impl TryFrom<&[Point2D]> for EyeLandmarks {
    type Error = DetectionError;

    fn try_from(points: &[Point2D]) -> Result<Self, Self::Error> {
        let points: [Point2D; EYE_LANDMARK_COUNT] =
            points
                .try_into()
                .map_err(|_| DetectionError::InvalidLandmarks {
                    expected: EYE_LANDMARK_COUNT,
                    actual: points.len(),
                })?;
        Ok(Self(points))
    }
}

/// Raw landmark output for a single detected face.
///
/// Eye point lists are validated into [`EyeLandmarks`] by the detection loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceLandmarks {
    /// Face bounding box.
    pub bounding_box: Rect,
    /// Left eye points.
    pub left_eye: Vec<Point2D>,
    /// Right eye points.
    pub right_eye: Vec<Point2D>,
}

impl FaceLandmarks {
    /// Validates both eye point lists.
    ///
    /// # Errors
    ///
    /// Returns [`DetectionError::InvalidLandmarks`] if either eye does not have
    /// exactly six points.
    pub fn eyes(&self) -> Result<(EyeLandmarks, EyeLandmarks), DetectionError> {
        let left = EyeLandmarks::try_from(self.left_eye.as_slice())?;
        let right = EyeLandmarks::try_from(self.right_eye.as_slice())?;
        Ok((left, right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(n: usize) -> Vec<Point2D> {
        (0..n).map(|i| Point2D::new(i as f32, 0.0)).collect()
    }

    #[test]
    fn test_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_eye_landmarks_exact_length() {
        let eye = EyeLandmarks::try_from(points(6).as_slice());
        assert!(eye.is_ok());
    }

    #[test]
    fn test_eye_landmarks_rejects_short_and_long() {
        for n in [0, 5, 7, 68] {
            let err = EyeLandmarks::try_from(points(n).as_slice());
            assert!(
                matches!(err, Err(DetectionError::InvalidLandmarks { expected: 6, actual }) if actual == n),
                "length {n} should be rejected"
            );
        }
    }

    #[test]
    fn test_face_landmarks_reports_bad_eye() {
        let face = FaceLandmarks {
            bounding_box: Rect::default(),
            left_eye: points(6),
            right_eye: points(4),
        };
        assert!(matches!(
            face.eyes(),
            Err(DetectionError::InvalidLandmarks { actual: 4, .. })
        ));
    }
}
