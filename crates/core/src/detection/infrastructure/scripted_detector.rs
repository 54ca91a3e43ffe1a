use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::detection::domain::face_descriptor::FaceDescriptor;
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::shared::frame::Frame;

/// Shared view of how many times a [`ScriptedLandmarkDetector`] ran.
#[derive(Clone, Debug, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

enum Script {
    Always(Option<FaceDescriptor>),
    ByFrame(HashMap<usize, FaceDescriptor>),
    Fail(String),
}

/// Detector that replays descriptors instead of running a model.
///
/// Stands in for the real detector in tests and offline runs where the
/// landmarks are known ahead of time.
pub struct ScriptedLandmarkDetector {
    script: Script,
    calls: CallCounter,
}

impl ScriptedLandmarkDetector {
    /// Report the same face for every frame.
    pub fn always(descriptor: FaceDescriptor) -> Self {
        Self::with_script(Script::Always(Some(descriptor)))
    }

    /// Never find a face.
    pub fn never() -> Self {
        Self::with_script(Script::Always(None))
    }

    /// Report a face only for the listed frame indices.
    pub fn by_frame(faces: HashMap<usize, FaceDescriptor>) -> Self {
        Self::with_script(Script::ByFrame(faces))
    }

    /// Fail every call with `message`.
    pub fn failing(message: &str) -> Self {
        Self::with_script(Script::Fail(message.to_string()))
    }

    pub fn call_counter(&self) -> CallCounter {
        self.calls.clone()
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: CallCounter::default(),
        }
    }
}

impl LandmarkDetector for ScriptedLandmarkDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<FaceDescriptor>, Box<dyn std::error::Error>> {
        self.calls.increment();
        match &self.script {
            Script::Always(face) => Ok(face.clone()),
            Script::ByFrame(faces) => Ok(faces.get(&frame.index()).cloned()),
            Script::Fail(message) => Err(message.clone().into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::PixelFormat;
    use crate::shared::geometry::Rect;

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0u8; 3], 1, 1, PixelFormat::Rgb8, index)
    }

    #[test]
    fn test_always_returns_same_face() {
        let face = FaceDescriptor::new(Rect::new(1.0, 2.0, 3.0, 4.0));
        let mut det = ScriptedLandmarkDetector::always(face.clone());
        assert_eq!(det.detect(&frame(0)).unwrap(), Some(face.clone()));
        assert_eq!(det.detect(&frame(9)).unwrap(), Some(face));
    }

    #[test]
    fn test_by_frame_misses_unlisted_frames() {
        let face = FaceDescriptor::new(Rect::new(1.0, 2.0, 3.0, 4.0));
        let mut det = ScriptedLandmarkDetector::by_frame(HashMap::from([(2, face.clone())]));
        assert!(det.detect(&frame(1)).unwrap().is_none());
        assert_eq!(det.detect(&frame(2)).unwrap(), Some(face));
    }

    #[test]
    fn test_counter_tracks_calls_after_move() {
        let det = ScriptedLandmarkDetector::never();
        let calls = det.call_counter();
        let mut boxed: Box<dyn LandmarkDetector> = Box::new(det);
        boxed.detect(&frame(0)).unwrap();
        boxed.detect(&frame(1)).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_failing_returns_error() {
        let mut det = ScriptedLandmarkDetector::failing("boom");
        let err = det.detect(&frame(0)).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
