/// Clockwise rotation that turns a captured buffer upright.
///
/// Capture devices and containers report this as degrees; anything that is
/// not a multiple of 90 snaps to the nearest quadrant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Up,
    Right,
    Down,
    Left,
}

impl Orientation {
    pub fn from_degrees(angle: i32) -> Self {
        match normalize_rotation(angle) {
            90 => Orientation::Right,
            180 => Orientation::Down,
            270 => Orientation::Left,
            _ => Orientation::Up,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Orientation::Up => 0,
            Orientation::Right => 90,
            Orientation::Down => 180,
            Orientation::Left => 270,
        }
    }

    /// Whether applying this rotation swaps width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Orientation::Right | Orientation::Left)
    }
}

/// Normalizes an angle to one of 0, 90, 180, or 270.
pub fn normalize_rotation(angle: i32) -> i32 {
    let normalized = angle.rem_euclid(360);
    match normalized {
        0..=44 | 316..=359 => 0,
        45..=134 => 90,
        135..=224 => 180,
        225..=315 => 270,
        _ => 0,
    }
}
