//! Per-frame analysis results

use serde::{Deserialize, Serialize};

use crate::detector::DetectionResult;
use crate::state::{AlertState, Transition};

/// Everything the renderer needs to know about one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Frame sequence number
    pub sequence: u32,

    /// Face and eye regions
    pub detection: DetectionResult,

    /// Low-eye counter after this frame
    pub consecutive_low_eye_frames: u32,

    /// Decision after this frame
    pub alert_state: AlertState,

    /// Set on the frame where the decision changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
}

impl FrameAnalysis {
    pub fn eye_count(&self) -> usize {
        self.detection.eye_count()
    }

    pub fn is_alert(&self) -> bool {
        self.alert_state.is_alert()
    }
}
