//! 5-point face landmarks as emitted by pose-style face detectors.
//!
//! Point order: left eye, right eye, nose, left mouth corner, right mouth corner.

use crate::shared::geometry::{Point, Rect};

use super::face_descriptor::FaceDescriptor;

const LEFT_EYE: usize = 0;
const RIGHT_EYE: usize = 1;
const NOSE: usize = 2;
const LEFT_MOUTH: usize = 3;
const RIGHT_MOUTH: usize = 4;

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    /// `None` marks a keypoint below the visibility threshold.
    points: [Option<Point>; 5],
}

impl FaceLandmarks {
    pub fn new(points: [Option<Point>; 5]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Option<Point>; 5] {
        &self.points
    }

    pub fn has_visible(&self) -> bool {
        self.points.iter().any(Option::is_some)
    }

    pub fn left_eye(&self) -> Option<Point> {
        self.points[LEFT_EYE]
    }

    pub fn right_eye(&self) -> Option<Point> {
        self.points[RIGHT_EYE]
    }

    pub fn nose(&self) -> Option<Point> {
        self.points[NOSE]
    }

    /// Mouth position: midpoint of both corners, or the single visible corner.
    pub fn mouth(&self) -> Option<Point> {
        match (self.points[LEFT_MOUTH], self.points[RIGHT_MOUTH]) {
            (Some(l), Some(r)) => Some(Point::midpoint(l, r)),
            (Some(p), None) | (None, Some(p)) => Some(p),
            (None, None) => None,
        }
    }

    pub fn to_descriptor(
        &self,
        bounds: Rect,
        confidence: f64,
        track_id: Option<u32>,
    ) -> FaceDescriptor {
        FaceDescriptor {
            bounds,
            left_eye: self.left_eye(),
            right_eye: self.right_eye(),
            mouth: self.mouth(),
            confidence,
            track_id,
        }
    }
}
