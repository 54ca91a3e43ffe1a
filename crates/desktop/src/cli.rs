use std::path::PathBuf;

use clap::Parser;

use crate::settings::{Accuracy, Settings};

/// Live camera view with cartoon eyes drawn over your own.
///
/// Flags override the saved settings for this run; pass --save to keep them.
#[derive(Parser, Debug, Default)]
#[command(name = "eyeball-desktop")]
pub struct Cli {
    /// Capture device (/dev/video0, 0, "video=Integrated Camera") or a video file.
    #[arg(long)]
    pub device: Option<String>,

    /// libavdevice input format such as v4l2, avfoundation or dshow.
    #[arg(long)]
    pub input_format: Option<String>,

    /// Probe the device as a regular file or stream instead of using an input format.
    #[arg(long, conflicts_with = "input_format")]
    pub no_input_format: bool,

    /// Clockwise rotation in degrees applied to every frame, overriding the device.
    #[arg(long, allow_hyphen_values = true)]
    pub rotation: Option<i32>,

    /// Overlay image (PNG with alpha recommended). Defaults to a drawn cartoon eyeball.
    #[arg(long)]
    pub overlay: Option<PathBuf>,

    /// Diameter in pixels of the built-in eyeball.
    #[arg(long)]
    pub overlay_diameter: Option<u32>,

    /// Landmark detection accuracy.
    #[arg(long, value_enum)]
    pub accuracy: Option<Accuracy>,

    /// Disable face tracking and smoothing between frames.
    #[arg(long)]
    pub no_tracking: bool,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Composite on the CPU even if a GPU is available.
    #[arg(long)]
    pub cpu: bool,

    /// Detect once per frame and share the result between both eyes.
    #[arg(long)]
    pub reuse_detection: bool,

    /// Initial window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Initial window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Persist the resulting settings.
    #[arg(long)]
    pub save: bool,
}

impl Cli {
    /// Layer the flags given on the command line over `settings`.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(device) = &self.device {
            settings.device = device.clone();
        }
        if self.no_input_format {
            settings.input_format = None;
        } else if let Some(format) = &self.input_format {
            settings.input_format = Some(format.clone());
        }
        if let Some(rotation) = self.rotation {
            settings.rotation = Some(rotation);
        }
        if let Some(path) = &self.overlay {
            settings.overlay_path = Some(path.clone());
        }
        if let Some(diameter) = self.overlay_diameter {
            settings.overlay_diameter = diameter;
        }
        if let Some(accuracy) = self.accuracy {
            settings.accuracy = accuracy;
        }
        if self.no_tracking {
            settings.tracking = false;
        }
        if let Some(confidence) = self.confidence {
            settings.confidence = confidence;
        }
        if self.cpu {
            settings.prefer_gpu = false;
        }
        if self.reuse_detection {
            settings.reuse_detection = true;
        }
        if let Some(width) = self.width {
            settings.window_width = width;
        }
        if let Some(height) = self.height {
            settings.window_height = height;
        }
        settings
    }
}
