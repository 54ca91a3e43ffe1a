use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open capture input {input}: {reason}")]
    Open { input: String, reason: String },
    #[error("no video stream in {0}")]
    NoVideoStream(String),
    #[error("capture source already started")]
    AlreadyStarted,
    #[error("capture thread failed: {0}")]
    Thread(String),
    #[error("invalid raw frame: {0}")]
    InvalidFrame(String),
}

/// Byte layout of a buffer as the device delivered it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawPixelFormat {
    Rgb24,
    Rgba,
    Bgra,
}

impl RawPixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            RawPixelFormat::Rgb24 => 3,
            RawPixelFormat::Rgba | RawPixelFormat::Bgra => 4,
        }
    }
}

/// A frame exactly as the capture device produced it.
///
/// Rows may be padded (`stride >= width * bytes_per_pixel`) and the image
/// may need `rotation` degrees of clockwise rotation to appear upright.
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub format: RawPixelFormat,
    pub rotation: i32,
}

/// Receives each raw frame on the capture thread.
pub type FrameCallback = Box<dyn FnMut(RawFrame) + Send>;

/// A camera-like device that pushes frames from its own thread.
pub trait FrameSource: Send {
    /// Opens the device and begins delivering frames to `on_frame`.
    ///
    /// Returns once the device is open; failing to open is reported here
    /// rather than on the capture thread.
    fn start(&mut self, on_frame: FrameCallback) -> Result<(), CaptureError>;

    /// Stops delivery and waits for the capture thread to exit. Idempotent.
    fn stop(&mut self);
}
