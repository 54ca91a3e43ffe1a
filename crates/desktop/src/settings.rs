use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use eyeball_core::capture::infrastructure::ffmpeg_capture_source::CaptureConfig;
use eyeball_core::detection::domain::detector_options::{
    DetectorAccuracy, DetectorOptions, DEFAULT_CONFIDENCE,
};
use eyeball_core::shared::constants::{
    APP_NAME, DEFAULT_OVERLAY_DIAMETER, MAX_OVERLAY_DIAMETER, MIN_OVERLAY_DIAMETER,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    High,
    Low,
}

impl From<Accuracy> for DetectorAccuracy {
    fn from(accuracy: Accuracy) -> Self {
        match accuracy {
            Accuracy::High => DetectorAccuracy::High,
            Accuracy::Low => DetectorAccuracy::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: String,
    pub input_format: Option<String>,
    pub rotation: Option<i32>,
    pub overlay_path: Option<PathBuf>,
    pub overlay_diameter: u32,
    pub accuracy: Accuracy,
    pub tracking: bool,
    pub confidence: f64,
    pub prefer_gpu: bool,
    pub reuse_detection: bool,
    pub window_width: u32,
    pub window_height: u32,
}

#[cfg(target_os = "linux")]
fn default_device() -> (&'static str, Option<&'static str>) {
    ("/dev/video0", Some("v4l2"))
}

#[cfg(target_os = "macos")]
fn default_device() -> (&'static str, Option<&'static str>) {
    ("0", Some("avfoundation"))
}

#[cfg(target_os = "windows")]
fn default_device() -> (&'static str, Option<&'static str>) {
    ("video=Integrated Camera", Some("dshow"))
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn default_device() -> (&'static str, Option<&'static str>) {
    ("0", None)
}

impl Default for Settings {
    fn default() -> Self {
        let (device, input_format) = default_device();
        Self {
            device: device.to_string(),
            input_format: input_format.map(str::to_string),
            rotation: None,
            overlay_path: None,
            overlay_diameter: DEFAULT_OVERLAY_DIAMETER,
            accuracy: Accuracy::High,
            tracking: true,
            confidence: DEFAULT_CONFIDENCE,
            prefer_gpu: true,
            reuse_detection: false,
            window_width: 960,
            window_height: 540,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_NAME).join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing or unreadable files fall back to defaults; missing fields
    /// take their default values.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no config directory"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.device.trim().is_empty() {
            return Err("Capture device must not be empty".into());
        }
        if !(MIN_OVERLAY_DIAMETER..=MAX_OVERLAY_DIAMETER).contains(&self.overlay_diameter) {
            return Err(format!(
                "Overlay diameter must be between {MIN_OVERLAY_DIAMETER} and {MAX_OVERLAY_DIAMETER} pixels, got {}",
                self.overlay_diameter
            ));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(format!(
                "Window size must be non-zero, got {}x{}",
                self.window_width, self.window_height
            ));
        }
        self.detector_options().validate()
    }

    pub fn detector_options(&self) -> DetectorOptions {
        DetectorOptions {
            accuracy: self.accuracy.into(),
            tracking: self.tracking,
            confidence: self.confidence,
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            input: self.device.clone(),
            input_format: self.input_format.clone(),
            rotation_override: self.rotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_through_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let settings = Settings {
            device: "/dev/video2".into(),
            rotation: Some(90),
            overlay_path: Some(PathBuf::from("/tmp/eye.png")),
            accuracy: Accuracy::Low,
            reuse_detection: true,
            ..Default::default()
        };

        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{ "device": "1", "accuracy": "low" }"#).unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.device, "1");
        assert_eq!(settings.accuracy, Accuracy::Low);
        assert_eq!(settings.overlay_diameter, DEFAULT_OVERLAY_DIAMETER);
        assert!(settings.tracking);
    }

    #[test]
    fn test_unreadable_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
        assert_eq!(
            Settings::load_from(&tmp.path().join("missing.json")),
            Settings::default()
        );
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[rstest]
    #[case::empty_device(Settings { device: " ".into(), ..Default::default() })]
    #[case::tiny_overlay(Settings { overlay_diameter: 4, ..Default::default() })]
    #[case::huge_overlay(Settings { overlay_diameter: 40_000, ..Default::default() })]
    #[case::zero_window(Settings { window_height: 0, ..Default::default() })]
    #[case::bad_confidence(Settings { confidence: 1.2, ..Default::default() })]
    fn test_validate_rejects(#[case] settings: Settings) {
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_maps_to_core_options() {
        let settings = Settings {
            accuracy: Accuracy::Low,
            tracking: false,
            confidence: 0.4,
            rotation: Some(180),
            ..Default::default()
        };
        let opts = settings.detector_options();
        assert_eq!(opts.accuracy, DetectorAccuracy::Low);
        assert!(!opts.tracking);
        assert_eq!(settings.capture_config().rotation_override, Some(180));
    }
}
