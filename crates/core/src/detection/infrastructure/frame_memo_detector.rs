use crate::detection::domain::face_descriptor::FaceDescriptor;
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::shared::frame::Frame;

/// Decorator that runs the inner detector at most once per frame index.
///
/// The overlay pipeline asks for landmarks once per eye pass on the same
/// source frame. Wrapping the detector in this memo collapses those calls
/// into one inference, and the tracker only advances once per frame. Output
/// is unchanged for detectors that are deterministic on a repeated frame.
pub struct FrameMemoDetector {
    inner: Box<dyn LandmarkDetector>,
    last: Option<(usize, Option<FaceDescriptor>)>,
}

impl FrameMemoDetector {
    pub fn new(inner: Box<dyn LandmarkDetector>) -> Self {
        Self { inner, last: None }
    }
}

impl LandmarkDetector for FrameMemoDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<FaceDescriptor>, Box<dyn std::error::Error>> {
        if let Some((index, result)) = &self.last {
            if *index == frame.index() {
                return Ok(result.clone());
            }
        }

        let result = self.inner.detect(frame)?;
        self.last = Some((frame.index(), result.clone()));
        Ok(result)
    }
}
