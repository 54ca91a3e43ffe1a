use crate::shared::frame::Frame;

use super::face_descriptor::FaceDescriptor;

/// Domain interface for landmark detection.
///
/// Returns the primary face in the frame, or `None` when no face is found.
/// Implementations may keep tracking state across calls, hence `&mut self`.
pub trait LandmarkDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Option<FaceDescriptor>, Box<dyn std::error::Error>>;
}
