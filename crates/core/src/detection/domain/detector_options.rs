/// Inference resolution for high accuracy when the model doesn't pin one.
pub const HIGH_ACCURACY_INPUT_SIZE: u32 = 640;
pub const LOW_ACCURACY_INPUT_SIZE: u32 = 320;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorAccuracy {
    /// Smaller inference resolution; faster, misses small faces.
    Low,
    High,
}

/// Construction-time options for a landmark detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorOptions {
    pub accuracy: DetectorAccuracy,
    pub tracking: bool,
    pub confidence: f64,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            accuracy: DetectorAccuracy::High,
            tracking: true,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl DetectorOptions {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            ));
        }
        Ok(())
    }
}
