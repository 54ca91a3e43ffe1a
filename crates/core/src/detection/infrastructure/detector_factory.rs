use std::path::Path;

use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::landmark_detector::LandmarkDetector;

use super::frame_memo_detector::FrameMemoDetector;
use super::onnx_landmark_detector::OnnxLandmarkDetector;

/// Build the process-wide landmark detector.
///
/// With `reuse_detection` the detector runs once per frame and both eye
/// passes share the result; otherwise every pass re-detects.
pub fn create_detector(
    model_path: &Path,
    options: DetectorOptions,
    reuse_detection: bool,
) -> Result<Box<dyn LandmarkDetector>, Box<dyn std::error::Error>> {
    let detector = OnnxLandmarkDetector::new(model_path, options)?;
    Ok(with_reuse(Box::new(detector), reuse_detection))
}

pub fn with_reuse(detector: Box<dyn LandmarkDetector>, reuse_detection: bool) -> Box<dyn LandmarkDetector> {
    if reuse_detection {
        log::info!("Reusing one detection for both eye passes");
        Box::new(FrameMemoDetector::new(detector))
    } else {
        detector
    }
}
