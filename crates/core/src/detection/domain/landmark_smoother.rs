use crate::shared::geometry::{Point, Rect};

use super::face_descriptor::FaceDescriptor;

pub const DEFAULT_ALPHA: f64 = 0.6;

/// Domain interface for temporal smoothing of a tracked face.
pub trait LandmarkSmootherInterface: Send {
    fn smooth(&mut self, descriptor: FaceDescriptor) -> FaceDescriptor;
}

/// EMA (Exponential Moving Average) smoother for the primary face.
///
/// Formula: `ema[t] = alpha * current + (1 - alpha) * ema[t-1]`
///
/// State belongs to one track id; a new id restarts smoothing. A feature is
/// only smoothed when it was present in both the previous and the current
/// observation. A missing feature stays missing.
pub struct LandmarkSmoother {
    alpha: f64,
    state: Option<(u32, FaceDescriptor)>,
}

impl LandmarkSmoother {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: None }
    }

    fn blend(&self, current: f64, previous: f64) -> f64 {
        self.alpha * current + (1.0 - self.alpha) * previous
    }

    fn blend_point(&self, current: Option<Point>, previous: Option<Point>) -> Option<Point> {
        match (current, previous) {
            (Some(c), Some(p)) => Some(Point::new(self.blend(c.x, p.x), self.blend(c.y, p.y))),
            (current, _) => current,
        }
    }

    fn blend_rect(&self, current: Rect, previous: Rect) -> Rect {
        let c = current.corners();
        let p = previous.corners();
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = self.blend(c[i], p[i]);
        }
        Rect::from_corners(out)
    }
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

impl LandmarkSmootherInterface for LandmarkSmoother {
    fn smooth(&mut self, descriptor: FaceDescriptor) -> FaceDescriptor {
        let Some(tid) = descriptor.track_id else {
            return descriptor;
        };

        let smoothed = match &self.state {
            Some((prev_id, prev)) if *prev_id == tid => FaceDescriptor {
                bounds: self.blend_rect(descriptor.bounds, prev.bounds),
                left_eye: self.blend_point(descriptor.left_eye, prev.left_eye),
                right_eye: self.blend_point(descriptor.right_eye, prev.right_eye),
                mouth: self.blend_point(descriptor.mouth, prev.mouth),
                ..descriptor
            },
            _ => descriptor,
        };

        self.state = Some((tid, smoothed.clone()));
        smoothed
    }
}
