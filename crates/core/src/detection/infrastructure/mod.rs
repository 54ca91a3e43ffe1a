pub mod detector_factory;
pub mod execution_provider;
pub mod frame_memo_detector;
pub mod math;
pub mod model_resolver;
pub mod onnx_landmark_detector;
pub mod primary_face_tracker;
pub mod scripted_detector;
