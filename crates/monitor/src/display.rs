//! Display surfaces for annotated frames

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::info;

use crate::MonitorError;

/// What the display asks the monitor loop to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    Continue,
    /// Stop key pressed or surface closed
    Stop,
}

/// Shows one annotated frame at a time
pub trait DisplaySink {
    fn show(&mut self, image: &RgbImage) -> Result<DisplayEvent, MonitorError>;
}

/// Discards frames
#[derive(Debug, Default)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn show(&mut self, _image: &RgbImage) -> Result<DisplayEvent, MonitorError> {
        Ok(DisplayEvent::Continue)
    }
}

/// Writes each frame as a numbered PNG
pub struct FrameDirSink {
    dir: PathBuf,
    written: u64,
}

impl FrameDirSink {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, MonitorError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        info!("Writing annotated frames to {}", dir.display());
        Ok(Self { dir, written: 0 })
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl DisplaySink for FrameDirSink {
    fn show(&mut self, image: &RgbImage) -> Result<DisplayEvent, MonitorError> {
        let path = self.dir.join(format!("frame_{:06}.png", self.written));
        image.save(&path)?;
        self.written += 1;
        Ok(DisplayEvent::Continue)
    }
}

/// Titled preview window; ESC stops the monitor
#[cfg(feature = "window")]
pub struct WindowSink {
    window: minifb::Window,
    buffer: Vec<u32>,
}

#[cfg(feature = "window")]
impl WindowSink {
    pub fn open(title: &str, width: u32, height: u32) -> Result<Self, MonitorError> {
        let window = minifb::Window::new(
            title,
            width as usize,
            height as usize,
            minifb::WindowOptions::default(),
        )
        .map_err(|e| MonitorError::Display(e.to_string()))?;
        info!("Opened preview window '{}' ({}x{})", title, width, height);
        Ok(Self {
            window,
            buffer: Vec::new(),
        })
    }
}

#[cfg(feature = "window")]
impl DisplaySink for WindowSink {
    fn show(&mut self, image: &RgbImage) -> Result<DisplayEvent, MonitorError> {
        if !self.window.is_open() || self.window.is_key_down(minifb::Key::Escape) {
            return Ok(DisplayEvent::Stop);
        }

        self.buffer.clear();
        self.buffer.extend(
            image
                .pixels()
                .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32),
        );
        let (w, h) = image.dimensions();
        self.window
            .update_with_buffer(&self.buffer, w as usize, h as usize)
            .map_err(|e| MonitorError::Display(e.to_string()))?;

        if self.window.is_key_down(minifb::Key::Escape) {
            return Ok(DisplayEvent::Stop);
        }
        Ok(DisplayEvent::Continue)
    }
}
