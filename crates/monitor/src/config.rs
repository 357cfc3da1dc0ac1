//! Layered configuration: defaults, optional TOML file, then `DROWSY_*`
//! environment variables (`DROWSY_DMS__EYES_THRESHOLD=20`).

use std::path::Path;

use alerting::AlertConfig;
use camera_capture::CameraConfig;
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::render::RenderConfig;
use crate::MonitorError;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DROWSY";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub camera: CameraConfig,
    pub dms: DmsConfig,
    pub alert: AlertConfig,
    pub render: RenderConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Display surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub title: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: "DROWSINESS DETECTION - FULL SCREEN ALERTS".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl MonitorConfig {
    /// Load from an optional file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: MonitorConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the monitor cannot run with
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(MonitorError::InvalidConfig(format!(
                "camera resolution {}x{} is empty",
                self.camera.width, self.camera.height
            )));
        }
        if !self.dms.nominal_fps.is_finite() || self.dms.nominal_fps <= 0.0 {
            return Err(MonitorError::InvalidConfig(format!(
                "nominal_fps {} must be a positive number",
                self.dms.nominal_fps
            )));
        }
        if self.alert.flash_on_interval_ms == 0 || self.alert.flash_off_interval_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "flash intervals must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.render.overlay_alpha) {
            return Err(MonitorError::InvalidConfig(format!(
                "overlay_alpha {} outside [0, 1]",
                self.render.overlay_alpha
            )));
        }
        Ok(())
    }
}
