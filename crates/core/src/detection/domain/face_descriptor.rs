use crate::shared::geometry::{Point, Rect};

/// Which eye an overlay pass targets.
///
/// Left and right follow the detector's landmark labels, which are given in
/// image space: `Left` is the eye nearer the left edge of an upright frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EyeSelector {
    Left,
    Right,
}

impl EyeSelector {
    pub const BOTH: [EyeSelector; 2] = [EyeSelector::Left, EyeSelector::Right];
}

impl std::fmt::Display for EyeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EyeSelector::Left => write!(f, "left"),
            EyeSelector::Right => write!(f, "right"),
        }
    }
}

/// The primary face found in one frame.
///
/// Each feature is independently optional. A feature the detector did not
/// see stays `None`; nothing downstream fills it in.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceDescriptor {
    pub bounds: Rect,
    pub left_eye: Option<Point>,
    pub right_eye: Option<Point>,
    pub mouth: Option<Point>,
    pub confidence: f64,
    pub track_id: Option<u32>,
}

impl FaceDescriptor {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            left_eye: None,
            right_eye: None,
            mouth: None,
            confidence: 1.0,
            track_id: None,
        }
    }

    pub fn with_eyes(mut self, left: Option<Point>, right: Option<Point>) -> Self {
        self.left_eye = left;
        self.right_eye = right;
        self
    }

    pub fn with_mouth(mut self, mouth: Option<Point>) -> Self {
        self.mouth = mouth;
        self
    }

    pub fn eye(&self, selector: EyeSelector) -> Option<Point> {
        match selector {
            EyeSelector::Left => self.left_eye,
            EyeSelector::Right => self.right_eye,
        }
    }
}
