//! DMS configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Consecutive low-eye-count frames tolerated before the alert is raised
    pub eyes_threshold: u32,

    /// Capture rate the threshold was tuned for. Only used to report the
    /// approximate wall-clock latency; detection stays frame-count based.
    pub nominal_fps: f32,

    /// Smallest face region accepted (pixels, both sides)
    pub min_face_size: u32,

    /// Smallest eye region accepted (pixels, both sides)
    pub min_eye_size: u32,

    /// Face detection confidence threshold
    pub face_confidence: f32,

    /// Eye detection confidence threshold
    pub eye_confidence: f32,

    /// Square input resolution of the region models
    pub model_input_size: u32,

    /// Model paths
    pub face_model_path: Option<String>,
    pub eye_model_path: Option<String>,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            eyes_threshold: 35,
            nominal_fps: 30.0,
            min_face_size: 30,
            min_eye_size: 20,
            face_confidence: 0.7,
            eye_confidence: 0.6,
            model_input_size: 128,
            face_model_path: None,
            eye_model_path: None,
        }
    }
}

impl DmsConfig {
    /// Low-eye frames needed to raise the alert
    pub fn alert_after_frames(&self) -> u32 {
        self.eyes_threshold.saturating_add(1)
    }

    /// Approximate time of sustained eye loss before the alert fires,
    /// assuming frames arrive at `nominal_fps`.
    ///
    /// Zero when the rate is unknown (non-positive or NaN), `Duration::MAX`
    /// when it is too small to represent.
    pub fn approx_alert_latency(&self) -> Duration {
        if self.nominal_fps.is_nan() || self.nominal_fps <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f32(self.alert_after_frames() as f32 / self.nominal_fps)
            .unwrap_or(Duration::MAX)
    }
}
