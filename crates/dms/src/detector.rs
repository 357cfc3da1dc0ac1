//! Face and eye region detection

use std::collections::VecDeque;

use camera_capture::frame::VideoFrame;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::DmsError;

/// Axis-aligned region in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Shift by an ROI origin
    pub fn translate(&self, dx: u32, dy: u32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Both sides at least `min` pixels
    pub fn at_least(&self, min: u32) -> bool {
        self.width >= min && self.height >= min
    }

    /// Clip to a `width` x `height` frame; `None` if nothing is left
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let w = self.right().min(width).saturating_sub(x);
        let h = self.bottom().min(height).saturating_sub(y);
        (w > 0 && h > 0).then(|| Self::new(x, y, w, h))
    }
}

/// Regions found in one frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub faces: Vec<BoundingBox>,
    /// Eye regions in full-frame coordinates
    pub eyes: Vec<BoundingBox>,
}

impl DetectionResult {
    pub fn eye_count(&self) -> usize {
        self.eyes.len()
    }
}

/// Per-frame face/eye detector.
///
/// Never fails: a detector that cannot produce regions returns an empty
/// result, which the state machine reads as "no eyes visible".
pub trait EyeStateDetector: Send {
    fn detect(&mut self, frame: &VideoFrame) -> DetectionResult;
}

/// Single-class region proposer (faces, or eyes inside a face crop)
pub trait RegionDetector: Send {
    fn detect_regions(&self, frame: &VideoFrame) -> Result<Vec<BoundingBox>, DmsError>;
}

/// Faces first, then eyes searched inside each face
pub struct CascadeDetector {
    face: Box<dyn RegionDetector>,
    eye: Box<dyn RegionDetector>,
    min_face_size: u32,
    min_eye_size: u32,
}

impl CascadeDetector {
    pub fn new(
        face: Box<dyn RegionDetector>,
        eye: Box<dyn RegionDetector>,
        min_face_size: u32,
        min_eye_size: u32,
    ) -> Self {
        Self {
            face,
            eye,
            min_face_size,
            min_eye_size,
        }
    }
}

impl EyeStateDetector for CascadeDetector {
    fn detect(&mut self, frame: &VideoFrame) -> DetectionResult {
        let faces: Vec<BoundingBox> = match self.face.detect_regions(frame) {
            Ok(regions) => regions
                .into_iter()
                .filter_map(|r| r.clamp_to(frame.width, frame.height))
                .filter(|r| r.at_least(self.min_face_size))
                .collect(),
            Err(e) => {
                warn!("Face detection failed on frame {}: {}", frame.sequence, e);
                return DetectionResult::default();
            }
        };

        let mut eyes = Vec::new();
        for face in &faces {
            let Some(roi) = frame.crop(face.x, face.y, face.width, face.height) else {
                continue;
            };
            match self.eye.detect_regions(&roi) {
                Ok(regions) => eyes.extend(
                    regions
                        .into_iter()
                        .filter_map(|r| r.clamp_to(face.width, face.height))
                        .filter(|r| r.at_least(self.min_eye_size))
                        .map(|r| r.translate(face.x, face.y)),
                ),
                Err(e) => warn!("Eye detection failed on frame {}: {}", frame.sequence, e),
            }
        }

        debug!(
            "Frame {}: {} faces, {} eyes",
            frame.sequence,
            faces.len(),
            eyes.len()
        );
        DetectionResult { faces, eyes }
    }
}

/// ONNX region model.
///
/// Expects a `1x3xNxN` input in `[-1, 1]` and an output of rows
/// `[x1, y1, x2, y2, score]` normalized to the input frame.
pub struct OnnxRegionDetector {
    session: Session,
    input_size: u32,
    confidence_threshold: f32,
}

impl OnnxRegionDetector {
    pub fn new(path: &str, input_size: u32, confidence_threshold: f32) -> Result<Self, DmsError> {
        info!("Loading region model from {}", path);
        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| DmsError::ModelLoad(format!("{}: {}", path, e)))?;

        Ok(Self {
            session,
            input_size,
            confidence_threshold,
        })
    }

    fn to_tensor(&self, frame: &VideoFrame) -> Result<Array4<f32>, DmsError> {
        let img = image::ImageBuffer::<image::Rgb<u8>, _>::from_raw(
            frame.width,
            frame.height,
            frame.data.as_slice(),
        )
        .ok_or_else(|| DmsError::ImageProcessing("Failed to create image buffer".into()))?;

        let size = self.input_size;
        let resized = image::imageops::resize(&img, size, size, image::imageops::FilterType::Triangle);

        let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                input[[0, c, y as usize, x as usize]] = (pixel[c] as f32 / 127.5) - 1.0;
            }
        }
        Ok(input)
    }
}

impl RegionDetector for OnnxRegionDetector {
    fn detect_regions(&self, frame: &VideoFrame) -> Result<Vec<BoundingBox>, DmsError> {
        if frame.width == 0 || frame.height == 0 {
            return Ok(Vec::new());
        }
        let input = self.to_tensor(frame)?;

        let outputs = self
            .session
            .run(ort::inputs![input].map_err(|e| DmsError::Inference(e.to_string()))?)
            .map_err(|e| DmsError::Inference(e.to_string()))?;
        let values: Vec<f32> = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DmsError::Inference(e.to_string()))?
            .iter()
            .copied()
            .collect();

        Ok(decode_rows(&values, self.confidence_threshold, frame.width, frame.height))
    }
}

/// Turn normalized `[x1, y1, x2, y2, score]` rows into pixel boxes
fn decode_rows(values: &[f32], confidence: f32, width: u32, height: u32) -> Vec<BoundingBox> {
    values
        .chunks_exact(5)
        .filter(|row| row[4] >= confidence)
        .filter_map(|row| {
            let x1 = (row[0].clamp(0.0, 1.0) * width as f32) as u32;
            let y1 = (row[1].clamp(0.0, 1.0) * height as f32) as u32;
            let x2 = (row[2].clamp(0.0, 1.0) * width as f32) as u32;
            let y2 = (row[3].clamp(0.0, 1.0) * height as f32) as u32;
            (x2 > x1 && y2 > y1).then(|| BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
        })
        .collect()
}

/// Largest eye count a replay script may contain
pub const MAX_SCRIPTED_EYES: usize = 64;

/// Replays a fixed sequence of eye counts, one per frame.
///
/// Once the script runs out every frame reports no regions.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDetector {
    counts: VecDeque<usize>,
}

impl ScriptedDetector {
    pub fn new(counts: impl IntoIterator<Item = usize>) -> Self {
        Self {
            counts: counts.into_iter().collect(),
        }
    }

    /// Parse whitespace-separated eye counts, each at most [`MAX_SCRIPTED_EYES`]
    pub fn parse(script: &str) -> Result<Self, DmsError> {
        let counts = script
            .split_whitespace()
            .map(|token| {
                let count = token
                    .parse::<usize>()
                    .map_err(|_| DmsError::Config(format!("invalid eye count '{}'", token)))?;
                if count > MAX_SCRIPTED_EYES {
                    return Err(DmsError::Config(format!(
                        "eye count {} exceeds {}",
                        count, MAX_SCRIPTED_EYES
                    )));
                }
                Ok(count)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(counts))
    }

    pub fn remaining(&self) -> usize {
        self.counts.len()
    }
}

impl EyeStateDetector for ScriptedDetector {
    fn detect(&mut self, frame: &VideoFrame) -> DetectionResult {
        let Some(count) = self.counts.pop_front() else {
            return DetectionResult::default();
        };
        if count == 0 {
            return DetectionResult::default();
        }

        // Eyes left to right across the face; positions saturate at the edge
        let face = BoundingBox::new(frame.width / 4, frame.height / 4, frame.width / 2, frame.height / 2);
        let slots = u32::try_from(count).unwrap_or(u32::MAX);
        let eye_w = (face.width / slots.saturating_mul(2)).max(1);
        let eyes = (0..count)
            .map(|i| {
                let i = u32::try_from(i).unwrap_or(u32::MAX);
                let x = face.x.saturating_add(i.saturating_mul(eye_w).saturating_mul(2));
                BoundingBox::new(x, face.y + face.height / 4, eye_w, eye_w)
            })
            .collect();

        DetectionResult {
            faces: vec![face],
            eyes,
        }
    }
}
