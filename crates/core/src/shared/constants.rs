pub const APP_NAME: &str = "Eyeball";

pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Max frames the primary face can be lost before its track is dropped (~1 second at 30 fps).
pub const TRACKER_MAX_LOST: usize = 30;

/// Diameter in pixels of the built-in cartoon eyeball.
pub const DEFAULT_OVERLAY_DIAMETER: u32 = 64;

/// Bounds for the built-in eyeball diameter.
pub const MIN_OVERLAY_DIAMETER: u32 = 8;
pub const MAX_OVERLAY_DIAMETER: u32 = 4096;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
