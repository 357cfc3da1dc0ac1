//! Frame sources

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::imageops::{self, FilterType};
use tracing::{debug, info};

use crate::{CameraConfig, CameraError, VideoFrame};

/// Supported still-image extensions for directory playback
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Sequential frame supplier.
///
/// `Ok(None)` signals end of stream; an `Err` is a failed acquisition,
/// which the monitor also treats as the end of the stream.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;
}

/// Plays back a directory of image files in lexical order
pub struct ImageDirSource {
    files: VecDeque<PathBuf>,
    width: u32,
    height: u32,
    started: Instant,
    sequence: u32,
}

impl ImageDirSource {
    /// Open a directory of frames, resizing each one to the configured resolution
    pub fn open(dir: impl AsRef<Path>, config: &CameraConfig) -> Result<Self, CameraError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if config.width == 0 || config.height == 0 {
            return Err(CameraError::Format(format!(
                "invalid resolution {}x{}",
                config.width, config.height
            )));
        }

        info!(
            "Opened frame directory {} ({} frames @ {}x{})",
            dir.display(),
            files.len(),
            config.width,
            config.height
        );

        Ok(Self {
            files: files.into(),
            width: config.width,
            height: config.height,
            started: Instant::now(),
            sequence: 0,
        })
    }

    /// Frames left to play
    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let Some(path) = self.files.pop_front() else {
            return Ok(None);
        };

        let index = self.sequence as usize;
        let img = image::open(&path)
            .map_err(|e| CameraError::Read {
                index,
                reason: format!("{}: {}", path.display(), e),
            })?
            .to_rgb8();

        let img = if img.dimensions() != (self.width, self.height) {
            debug!("Resizing {} to {}x{}", path.display(), self.width, self.height);
            imageops::resize(&img, self.width, self.height, FilterType::Triangle)
        } else {
            img
        };

        let frame = VideoFrame::from_rgb_image(
            img,
            self.started.elapsed().as_nanos() as u64,
            self.sequence,
        );
        self.sequence += 1;
        Ok(Some(frame))
    }
}

/// Yields a fixed list of frames
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<VideoFrame>,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = VideoFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        Ok(self.frames.pop_front())
    }
}

/// Yields `count` black frames, used for scripted replays
#[derive(Debug)]
pub struct BlankSource {
    width: u32,
    height: u32,
    count: usize,
    emitted: usize,
}

impl BlankSource {
    pub fn new(config: &CameraConfig, count: usize) -> Self {
        Self {
            width: config.width,
            height: config.height,
            count,
            emitted: 0,
        }
    }
}

impl FrameSource for BlankSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.emitted >= self.count {
            return Ok(None);
        }
        let frame = VideoFrame::blank(self.width, self.height, self.emitted as u32);
        self.emitted += 1;
        Ok(Some(frame))
    }
}
