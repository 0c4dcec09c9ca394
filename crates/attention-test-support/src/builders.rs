//! Synthetic landmark and frame builders for testing.

use attention_core::ports::Detection;
use attention_core::{FaceLandmarks, Point2D, Rect, VideoFrame};
use image::{Rgb, RgbImage};

/// Horizontal span of every synthetic eye.
const EYE_WIDTH: f32 = 30.0;

/// Builder for landmark sets with a known Eye Aspect Ratio.
///
/// Eyes are laid out so that both vertical distances equal `ear * 30` over a
/// horizontal span of 30, which makes `compute_ear` return `ear` exactly.
pub struct LandmarkBuilder;

impl LandmarkBuilder {
    /// Six eye points at `origin` (outer corner) with the given ratio.
    #[must_use]
    pub fn eye_with_ear(ear: f32, origin: Point2D) -> Vec<Point2D> {
        let half = ear * EYE_WIDTH / 2.0;
        let Point2D { x, y } = origin;
        vec![
            Point2D::new(x, y),
            Point2D::new(x + 10.0, y - half),
            Point2D::new(x + 20.0, y - half),
            Point2D::new(x + EYE_WIDTH, y),
            Point2D::new(x + 20.0, y + half),
            Point2D::new(x + 10.0, y + half),
        ]
    }

    /// Standard bounding box used by every synthetic face.
    #[must_use]
    pub const fn bounding_box() -> Rect {
        Rect::new(100.0, 80.0, 200.0, 220.0)
    }

    /// A face whose eyes have the given ratios.
    #[must_use]
    pub fn face(left_ear: f32, right_ear: f32) -> FaceLandmarks {
        FaceLandmarks {
            bounding_box: Self::bounding_box(),
            left_eye: Self::eye_with_ear(left_ear, Point2D::new(140.0, 160.0)),
            right_eye: Self::eye_with_ear(right_ear, Point2D::new(220.0, 160.0)),
        }
    }

    /// A detection result whose eyes have the given ratios.
    #[must_use]
    pub fn detection(left_ear: f32, right_ear: f32) -> Detection {
        Detection::Detected(Self::face(left_ear, right_ear))
    }

    /// A face whose left eye has coincident corners.
    #[must_use]
    pub fn degenerate_face() -> FaceLandmarks {
        let mut face = Self::face(0.3, 0.3);
        face.left_eye = vec![Point2D::new(150.0, 160.0); 6];
        face
    }

    /// A face whose left eye has `count` points instead of six.
    #[must_use]
    pub fn face_with_left_eye_points(count: usize) -> FaceLandmarks {
        let mut face = Self::face(0.3, 0.3);
        face.left_eye.resize(count, Point2D::new(150.0, 160.0));
        face
    }
}

/// Builder for synthetic video frames.
pub struct SyntheticFrame;

impl SyntheticFrame {
    /// A uniform gray frame of the given size.
    #[must_use]
    pub fn gray(sequence: u64, width: u32, height: u32) -> VideoFrame {
        let image = RgbImage::from_pixel(width, height, Rgb([128, 128, 128]));
        VideoFrame::new(sequence, format!("synthetic://frame-{sequence}"), image)
    }
}
