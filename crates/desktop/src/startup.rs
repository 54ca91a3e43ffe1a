use std::path::PathBuf;

use thiserror::Error;

use eyeball_core::capture::domain::frame_source::CaptureError;
use eyeball_core::capture::infrastructure::ffmpeg_capture_source::FfmpegCaptureSource;
use eyeball_core::compositing::domain::overlay_asset::OverlayAsset;
use eyeball_core::compositing::domain::overlay_compositor::OverlayCompositor;
use eyeball_core::compositing::infrastructure::compositor_factory::create_layer_compositor;
use eyeball_core::compositing::infrastructure::overlay_asset_loader::{
    load_overlay_asset, OverlayAssetError,
};
use eyeball_core::detection::infrastructure::detector_factory::create_detector;
use eyeball_core::detection::infrastructure::model_resolver::{
    self, ModelResolveError, FACE_LANDMARK_MODEL,
};
use eyeball_core::pipeline::live_overlay_use_case::LiveOverlayPipeline;
use eyeball_core::pipeline::pipeline_logger::LogPipelineLogger;
use eyeball_core::rendering::infrastructure::scaled_buffer_target::ScaledBufferTarget;

use crate::settings::Settings;

pub type Pipeline = LiveOverlayPipeline<ScaledBufferTarget>;

/// Presented frames between periodic timing summaries in the log.
const LOG_EVERY_FRAMES: u64 = 300;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("failed to save settings: {0}")]
    SaveSettings(#[source] std::io::Error),
    #[error(transparent)]
    Model(#[from] ModelResolveError),
    #[error("failed to load face landmark model: {0}")]
    Detector(String),
    #[error(transparent)]
    Overlay(#[from] OverlayAssetError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("window error: {0}")]
    Window(#[from] iced::Error),
}

/// Resolve the model, build every stage and start capturing.
///
/// Everything that can fail at startup fails here, before a window opens.
pub fn build_pipeline(settings: &Settings) -> Result<Pipeline, StartupError> {
    settings.validate().map_err(StartupError::InvalidSettings)?;

    let model_path = model_resolver::resolve(
        FACE_LANDMARK_MODEL,
        bundled_model_dir().as_deref(),
        Some(Box::new(download_progress)),
    )?;
    log::info!("Using face landmark model {}", model_path.display());

    let detector = create_detector(
        &model_path,
        settings.detector_options(),
        settings.reuse_detection,
    )
    .map_err(|e| StartupError::Detector(e.to_string()))?;

    let asset = match &settings.overlay_path {
        Some(path) => load_overlay_asset(path)?,
        None => OverlayAsset::cartoon_eyeball(settings.overlay_diameter),
    };
    let layer = create_layer_compositor(asset, settings.prefer_gpu);

    let mut pipeline = LiveOverlayPipeline::new(
        Box::new(FfmpegCaptureSource::new(settings.capture_config())),
        OverlayCompositor::new(detector, layer),
        ScaledBufferTarget::new(),
        Box::new(LogPipelineLogger::new(LOG_EVERY_FRAMES)),
    );
    pipeline.start()?;
    pipeline.layout(settings.window_width, settings.window_height);
    Ok(pipeline)
}

/// `models/` next to the executable, for pre-packaged installs.
fn bundled_model_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face landmark model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading face landmark model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_settings_fail_before_any_io() {
        let settings = Settings {
            confidence: 2.0,
            ..Default::default()
        };
        let result = build_pipeline(&settings);
        assert!(matches!(result, Err(StartupError::InvalidSettings(_))));
    }

    #[test]
    fn test_error_messages_are_readable() {
        let err = StartupError::InvalidSettings("bad".into());
        assert_eq!(err.to_string(), "invalid settings: bad");
        let err: StartupError = CaptureError::NoVideoStream("cam".into()).into();
        assert_eq!(err.to_string(), "no video stream in cam");
    }

    #[test]
    fn test_bundled_model_dir_is_beside_executable() {
        let dir = bundled_model_dir().unwrap();
        assert!(dir.ends_with("models"));
    }
}
