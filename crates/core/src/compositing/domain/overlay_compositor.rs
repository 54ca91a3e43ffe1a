use std::sync::Arc;

use crate::detection::domain::face_descriptor::{EyeSelector, FaceDescriptor};
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::shared::frame::Frame;

use super::layer_compositor::LayerCompositor;
use super::placement::Translation;

/// Places the overlay asset on one detected eye at a time.
///
/// Each call re-runs the detector on the source frame. The two eye passes
/// of a display frame therefore detect independently unless the detector is
/// wrapped in a per-frame memo.
pub struct OverlayCompositor {
    detector: Box<dyn LandmarkDetector>,
    layer: Box<dyn LayerCompositor>,
    last_face: Option<FaceDescriptor>,
}

impl OverlayCompositor {
    pub fn new(detector: Box<dyn LandmarkDetector>, layer: Box<dyn LayerCompositor>) -> Self {
        Self {
            detector,
            layer,
            last_face: None,
        }
    }

    /// Composite the overlay centered on `eye` as found in `source`.
    ///
    /// When the face or the selected eye is absent the background is
    /// returned as-is (the same `Arc`), never an error.
    pub fn composite(
        &mut self,
        background: &Arc<Frame>,
        source: &Frame,
        eye: EyeSelector,
    ) -> Result<Arc<Frame>, Box<dyn std::error::Error>> {
        self.last_face = self.detector.detect(source)?;

        let Some(position) = self.last_face.as_ref().and_then(|face| face.eye(eye)) else {
            return Ok(Arc::clone(background));
        };

        let at = Translation::centered_on(position, self.layer.asset());
        let composited = self.layer.source_atop(background, at)?;
        Ok(Arc::new(composited))
    }

    /// Left eye onto the raw frame, then right eye onto that result.
    pub fn composite_both_eyes(
        &mut self,
        frame: &Arc<Frame>,
    ) -> Result<Arc<Frame>, Box<dyn std::error::Error>> {
        let left = self.composite(frame, frame, EyeSelector::Left)?;
        self.composite(&left, frame, EyeSelector::Right)
    }

    /// The descriptor found by the most recent detection, if any.
    pub fn last_face(&self) -> Option<&FaceDescriptor> {
        self.last_face.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::compositing::domain::overlay_asset::OverlayAsset;
    use crate::compositing::infrastructure::cpu_layer_compositor::CpuLayerCompositor;
    use crate::detection::infrastructure::frame_memo_detector::FrameMemoDetector;
    use crate::detection::infrastructure::scripted_detector::ScriptedLandmarkDetector;
    use crate::shared::frame::PixelFormat;
    use crate::shared::geometry::{Extent, Point, Rect};
    use approx::assert_relative_eq;
    use rstest::rstest;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BG: u8 = 40;

    fn background(width: u32, height: u32) -> Arc<Frame> {
        Arc::new(Frame::new(
            vec![BG; (width * height * 3) as usize],
            width,
            height,
            PixelFormat::Rgb8,
            0,
        ))
    }

    fn solid_asset(width: u32, height: u32, rgba: [u8; 4]) -> OverlayAsset {
        OverlayAsset::new(rgba.repeat((width * height) as usize), width, height).unwrap()
    }

    fn face(left: Option<(f64, f64)>, right: Option<(f64, f64)>) -> FaceDescriptor {
        FaceDescriptor::new(Rect::new(0.0, 0.0, 100.0, 100.0)).with_eyes(
            left.map(|(x, y)| Point::new(x, y)),
            right.map(|(x, y)| Point::new(x, y)),
        )
    }

    fn cpu_compositor(detector: ScriptedLandmarkDetector, asset: OverlayAsset) -> OverlayCompositor {
        OverlayCompositor::new(Box::new(detector), Box::new(CpuLayerCompositor::new(asset)))
    }

    /// Records every placement instead of drawing.
    struct RecordingLayer {
        asset: OverlayAsset,
        placements: Arc<Mutex<Vec<Translation>>>,
    }

    impl LayerCompositor for RecordingLayer {
        fn asset(&self) -> &OverlayAsset {
            &self.asset
        }

        fn source_atop(
            &self,
            background: &Frame,
            at: Translation,
        ) -> Result<Frame, Box<dyn std::error::Error>> {
            self.placements.lock().unwrap().push(at);
            Ok(background.clone())
        }
    }

    // ── passthrough ─────────────────────────────────────────────────

    #[rstest]
    #[case::no_face(None, EyeSelector::Left)]
    #[case::left_missing(Some(face(None, Some((60.0, 40.0)))), EyeSelector::Left)]
    #[case::right_missing(Some(face(Some((30.0, 40.0)), None)), EyeSelector::Right)]
    fn test_missing_eye_returns_background_unchanged(
        #[case] detected: Option<FaceDescriptor>,
        #[case] eye: EyeSelector,
    ) {
        let detector = match detected {
            Some(f) => ScriptedLandmarkDetector::always(f),
            None => ScriptedLandmarkDetector::never(),
        };
        let mut compositor = cpu_compositor(detector, solid_asset(10, 10, RED));
        let bg = background(100, 80);

        let out = compositor.composite(&bg, &bg, eye).unwrap();
        assert!(Arc::ptr_eq(&out, &bg));
        assert_eq!(*out, *bg);
    }

    // ── extent preservation ─────────────────────────────────────────

    #[rstest]
    #[case::inside((50.0, 40.0))]
    #[case::straddling_corner((1.0, 1.0))]
    #[case::fully_outside((-500.0, -500.0))]
    fn test_output_extent_equals_background(#[case] eye: (f64, f64)) {
        let detector = ScriptedLandmarkDetector::always(face(Some(eye), None));
        let mut compositor = cpu_compositor(detector, solid_asset(30, 30, RED));
        let bg = background(100, 80);

        let out = compositor.composite(&bg, &bg, EyeSelector::Left).unwrap();
        assert_eq!(out.extent(), Extent::new(100, 80));
        assert_eq!(out.format(), bg.format());
    }

    // ── centering ───────────────────────────────────────────────────

    #[test]
    fn test_translation_centers_asset_on_eye() {
        let placements = Arc::new(Mutex::new(Vec::new()));
        let layer = RecordingLayer {
            asset: solid_asset(20, 12, RED),
            placements: placements.clone(),
        };
        let detector = ScriptedLandmarkDetector::always(face(Some((70.5, 33.0)), None));
        let mut compositor = OverlayCompositor::new(Box::new(detector), Box::new(layer));
        let bg = background(100, 80);

        compositor.composite(&bg, &bg, EyeSelector::Left).unwrap();

        let recorded = placements.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_relative_eq!(recorded[0].dx, 70.5 - 10.0);
        assert_relative_eq!(recorded[0].dy, 33.0 - 6.0);
    }

    #[test]
    fn test_overlay_pixels_centered_on_eye() {
        let detector = ScriptedLandmarkDetector::always(face(Some((50.0, 40.0)), None));
        let mut compositor = cpu_compositor(detector, solid_asset(10, 10, RED));
        let bg = background(100, 80);

        let out = compositor.composite(&bg, &bg, EyeSelector::Left).unwrap();

        // covers x 45..55, y 35..45
        assert_eq!(out.rgb_at(45, 35), Some([255, 0, 0]));
        assert_eq!(out.rgb_at(54, 44), Some([255, 0, 0]));
        assert_eq!(out.rgb_at(44, 40), Some([BG; 3]));
        assert_eq!(out.rgb_at(55, 40), Some([BG; 3]));
        // background itself is untouched
        assert_eq!(bg.rgb_at(50, 40), Some([BG; 3]));
    }

    // ── chaining ────────────────────────────────────────────────────

    #[test]
    fn test_both_eyes_present_after_chained_passes() {
        let detector = ScriptedLandmarkDetector::always(face(Some((25.0, 30.0)), Some((75.0, 30.0))));
        let mut compositor = cpu_compositor(detector, solid_asset(10, 10, RED));
        let bg = background(100, 60);

        let out = compositor.composite_both_eyes(&bg).unwrap();

        assert_eq!(out.rgb_at(25, 30), Some([255, 0, 0]));
        assert_eq!(out.rgb_at(75, 30), Some([255, 0, 0]));
        assert_eq!(out.rgb_at(50, 30), Some([BG; 3]));
        assert_eq!(out.extent(), bg.extent());
    }

    #[test]
    fn test_chaining_with_one_eye_keeps_only_that_overlay() {
        let detector = ScriptedLandmarkDetector::always(face(None, Some((75.0, 30.0))));
        let mut compositor = cpu_compositor(detector, solid_asset(10, 10, RED));
        let bg = background(100, 60);

        let out = compositor.composite_both_eyes(&bg).unwrap();

        assert_eq!(out.rgb_at(25, 30), Some([BG; 3]));
        assert_eq!(out.rgb_at(75, 30), Some([255, 0, 0]));
    }

    #[test]
    fn test_no_face_both_passes_return_original_frame() {
        let mut compositor = cpu_compositor(ScriptedLandmarkDetector::never(), solid_asset(10, 10, RED));
        let bg = background(40, 30);
        let out = compositor.composite_both_eyes(&bg).unwrap();
        assert!(Arc::ptr_eq(&out, &bg));
    }

    // ── detection per pass ──────────────────────────────────────────

    #[test]
    fn test_each_pass_detects_on_source_frame() {
        let detector = ScriptedLandmarkDetector::always(face(Some((25.0, 30.0)), Some((75.0, 30.0))));
        let calls = detector.call_counter();
        let mut compositor = cpu_compositor(detector, solid_asset(10, 10, RED));

        compositor.composite_both_eyes(&background(100, 60)).unwrap();
        assert_eq!(calls.get(), 2);
        assert!(compositor.last_face().is_some());
    }

    #[test]
    fn test_single_detection_matches_per_pass_detection() {
        let eyes = face(Some((25.0, 30.0)), Some((75.0, 30.0)));
        let bg = background(100, 60);

        let per_pass = ScriptedLandmarkDetector::always(eyes.clone());
        let per_pass_calls = per_pass.call_counter();
        let mut per_pass = cpu_compositor(per_pass, solid_asset(10, 10, RED));

        let once = ScriptedLandmarkDetector::always(eyes);
        let once_calls = once.call_counter();
        let mut once = OverlayCompositor::new(
            Box::new(FrameMemoDetector::new(Box::new(once))),
            Box::new(CpuLayerCompositor::new(solid_asset(10, 10, RED))),
        );

        let a = per_pass.composite_both_eyes(&bg).unwrap();
        let b = once.composite_both_eyes(&bg).unwrap();

        assert_eq!(*a, *b);
        assert_eq!(per_pass_calls.get(), 2);
        assert_eq!(once_calls.get(), 1);
    }

    #[test]
    fn test_detector_error_propagates() {
        let mut compositor = cpu_compositor(
            ScriptedLandmarkDetector::failing("inference failed"),
            solid_asset(10, 10, RED),
        );
        let bg = background(10, 10);
        let err = compositor.composite_both_eyes(&bg).unwrap_err();
        assert_eq!(err.to_string(), "inference failed");
    }
}
