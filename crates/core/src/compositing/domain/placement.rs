use crate::shared::geometry::{Extent, Point};

use super::overlay_asset::OverlayAsset;

/// 2D translation of the overlay's top-left corner in background pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Translation {
    pub dx: f64,
    pub dy: f64,
}

impl Translation {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Offset that centers `asset` on `point`.
    pub fn centered_on(point: Point, asset: &OverlayAsset) -> Self {
        let (hw, hh) = asset.half_extent();
        Self::new(point.x - hw, point.y - hh)
    }

    /// Whole-pixel placement, rounded to nearest.
    pub fn pixel_offset(&self) -> (i64, i64) {
        (self.dx.round() as i64, self.dy.round() as i64)
    }

    /// The part of an overlay of size `overlay` placed here that lands
    /// inside `background`, or `None` if nothing does.
    pub fn clip(&self, overlay: Extent, background: Extent) -> Option<OverlayWindow> {
        let (ox, oy) = self.pixel_offset();
        let bg_x0 = ox.max(0);
        let bg_y0 = oy.max(0);
        let bg_x1 = (ox + overlay.width as i64).min(background.width as i64);
        let bg_y1 = (oy + overlay.height as i64).min(background.height as i64);
        if bg_x1 <= bg_x0 || bg_y1 <= bg_y0 {
            return None;
        }
        Some(OverlayWindow {
            overlay_x: (bg_x0 - ox) as u32,
            overlay_y: (bg_y0 - oy) as u32,
            background_x: bg_x0 as u32,
            background_y: bg_y0 as u32,
            width: (bg_x1 - bg_x0) as u32,
            height: (bg_y1 - bg_y0) as u32,
        })
    }
}

/// Overlapping rectangle between a placed overlay and its background.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayWindow {
    pub overlay_x: u32,
    pub overlay_y: u32,
    pub background_x: u32,
    pub background_y: u32,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::even_asset(Point::new(100.0, 80.0), 20, 10, (90.0, 75.0))]
    #[case::odd_asset(Point::new(100.0, 80.0), 21, 11, (89.5, 74.5))]
    #[case::near_origin(Point::new(3.0, 2.0), 20, 20, (-7.0, -8.0))]
    fn test_centered_on_subtracts_half_extent(
        #[case] eye: Point,
        #[case] width: u32,
        #[case] height: u32,
        #[case] expected: (f64, f64),
    ) {
        let asset = OverlayAsset::new(vec![0u8; (width * height * 4) as usize], width, height).unwrap();
        let t = Translation::centered_on(eye, &asset);
        assert_relative_eq!(t.dx, expected.0);
        assert_relative_eq!(t.dy, expected.1);
    }

    #[rstest]
    #[case::exact(Translation::new(10.0, -4.0), (10, -4))]
    #[case::rounds_half_away(Translation::new(89.5, -7.5), (90, -8))]
    #[case::rounds_down(Translation::new(1.2, 3.4), (1, 3))]
    fn test_pixel_offset_rounds(#[case] t: Translation, #[case] expected: (i64, i64)) {
        assert_eq!(t.pixel_offset(), expected);
    }

    // ── clip ────────────────────────────────────────────────────────

    #[test]
    fn test_clip_fully_inside() {
        let w = Translation::new(10.0, 20.0)
            .clip(Extent::new(8, 6), Extent::new(100, 100))
            .unwrap();
        assert_eq!(
            w,
            OverlayWindow {
                overlay_x: 0,
                overlay_y: 0,
                background_x: 10,
                background_y: 20,
                width: 8,
                height: 6,
            }
        );
    }

    #[test]
    fn test_clip_top_left_overhang() {
        let w = Translation::new(-3.0, -2.0)
            .clip(Extent::new(8, 6), Extent::new(100, 100))
            .unwrap();
        assert_eq!((w.overlay_x, w.overlay_y), (3, 2));
        assert_eq!((w.background_x, w.background_y), (0, 0));
        assert_eq!((w.width, w.height), (5, 4));
    }

    #[test]
    fn test_clip_bottom_right_overhang() {
        let w = Translation::new(96.0, 97.0)
            .clip(Extent::new(8, 6), Extent::new(100, 100))
            .unwrap();
        assert_eq!((w.width, w.height), (4, 3));
        assert_eq!((w.overlay_x, w.overlay_y), (0, 0));
    }

    #[rstest]
    #[case::left_of(Translation::new(-8.0, 0.0))]
    #[case::below(Translation::new(0.0, 100.0))]
    #[case::far_away(Translation::new(1e6, 1e6))]
    fn test_clip_outside_is_none(#[case] t: Translation) {
        assert!(t.clip(Extent::new(8, 6), Extent::new(100, 100)).is_none());
    }
}
