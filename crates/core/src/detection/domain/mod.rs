pub mod detector_options;
pub mod face_descriptor;
pub mod face_landmarks;
pub mod landmark_detector;
pub mod landmark_smoother;
