//! Camera Capture Library for the Drowsiness Monitor
//!
//! Provides sequential frame acquisition behind the [`FrameSource`] trait.
//! Supports:
//! - Image directories (recorded sessions, 640x480 by default)
//! - In-memory frame lists
//! - Blank frames of a fixed count (scripted replay)

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{BlankSource, FrameSource, ImageDirSource, MemorySource};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Failed to read frame {index}: {reason}")]
    Read { index: usize, reason: String },
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Mirror frames horizontally before use
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            mirror: true,
        }
    }
}
