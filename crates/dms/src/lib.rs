//! Driver Monitoring System (DMS)
//!
//! Frame-level drowsiness inference:
//! - Face detection, then eye detection inside each face
//! - Consecutive low-eye-count tracking
//! - Threshold state machine (slow to alert, instant to recover)

pub mod analysis;
pub mod config;
pub mod detector;
pub mod state;

pub use analysis::FrameAnalysis;
pub use config::DmsConfig;
pub use detector::{
    BoundingBox, CascadeDetector, DetectionResult, EyeStateDetector, OnnxRegionDetector,
    RegionDetector, ScriptedDetector, MAX_SCRIPTED_EYES,
};
pub use state::{AlertState, DrowsinessState, DrowsinessStateMachine, Transition, MIN_OPEN_EYES};

use camera_capture::frame::VideoFrame;
use thiserror::Error;
use tracing::{info, warn};

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),
}

/// Driver monitoring module
pub struct DmsModule {
    detector: Box<dyn EyeStateDetector>,
    state: DrowsinessStateMachine,
}

impl DmsModule {
    /// Build the face/eye cascade from the configured models
    pub fn new(config: &DmsConfig) -> Result<Self, DmsError> {
        let (Some(face_path), Some(eye_path)) = (&config.face_model_path, &config.eye_model_path)
        else {
            return Err(DmsError::Config(
                "face_model_path and eye_model_path must both be set".into(),
            ));
        };

        let face = OnnxRegionDetector::new(face_path, config.model_input_size, config.face_confidence)?;
        let eye = OnnxRegionDetector::new(eye_path, config.model_input_size, config.eye_confidence)?;
        let detector = CascadeDetector::new(
            Box::new(face),
            Box::new(eye),
            config.min_face_size,
            config.min_eye_size,
        );
        Ok(Self::with_detector(config, Box::new(detector)))
    }

    /// Use any detector implementation
    pub fn with_detector(config: &DmsConfig, detector: Box<dyn EyeStateDetector>) -> Self {
        if config.eyes_threshold == 0 {
            warn!("eyes_threshold is 0: a single low-eye frame raises the alert");
        }
        info!(
            "DMS ready: alert after {} low-eye frames (~{:.1}s at {} fps)",
            config.alert_after_frames(),
            config.approx_alert_latency().as_secs_f32(),
            config.nominal_fps
        );
        Self {
            detector,
            state: DrowsinessStateMachine::new(config.eyes_threshold),
        }
    }

    /// Detect regions and advance the state machine by one frame
    pub fn analyze(&mut self, frame: &VideoFrame) -> FrameAnalysis {
        let detection = self.detector.detect(frame);

        let before = self.state.alert_state();
        let after = self.state.observe(detection.eye_count());

        FrameAnalysis {
            sequence: frame.sequence,
            consecutive_low_eye_frames: self.state.state().consecutive_low_eye_frames,
            alert_state: after,
            transition: Transition::between(before, after),
            detection,
        }
    }

    pub fn state(&self) -> DrowsinessState {
        self.state.state()
    }

    /// Reset driver state (on driver change)
    pub fn reset_state(&mut self) {
        self.state.reset();
    }
}
