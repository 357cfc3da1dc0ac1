//! Overlay policy and drawing
//!
//! [`plan_overlay`] decides what goes on a frame; [`Renderer`] draws it.

use ab_glyph::FontVec;
use alerting::flash_visible;
use camera_capture::VideoFrame;
use dms::{BoundingBox, FrameAnalysis};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::MonitorError;

const FACE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const EYE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const READOUT_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const ALERT_RED: Rgb<u8> = Rgb([255, 0, 0]);
const BANNER_WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BANNER_CYAN: Rgb<u8> = Rgb([0, 255, 255]);
const SAFE_GREEN: Rgb<u8> = Rgb([0, 255, 0]);

pub const DROWSY_BANNER: &str = "DROWSY DETECTED";
pub const WAKE_BANNER: &str = "WAKE UP!!!";
pub const SAFE_BANNER: &str = "EYES OPEN - SAFE";

/// Overlay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Weight of the red fill over the frame
    pub overlay_alpha: f32,
    /// Alert border thickness (px)
    pub border_thickness: u32,
    /// Outline thickness for face and eye boxes (px)
    pub box_thickness: u32,
    /// TTF/OTF font for banners; text is skipped without one
    pub font_path: Option<String>,
    pub readout_size: f32,
    pub banner_size: f32,
    pub safe_banner_size: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            overlay_alpha: 0.7,
            border_thickness: 15,
            box_thickness: 2,
            font_path: None,
            readout_size: 30.0,
            banner_size: 60.0,
            safe_banner_size: 36.0,
        }
    }
}

/// One drawing instruction
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Outlined region
    Outline {
        region: BoundingBox,
        color: Rgb<u8>,
        thickness: u32,
    },
    /// Translucent full-frame fill
    Fill { color: Rgb<u8>, alpha: f32 },
    /// Text with its baseline at `(x, y)`
    Text {
        text: String,
        x: i32,
        y: i32,
        size: f32,
        color: Rgb<u8>,
    },
    /// Solid frame border
    Border { color: Rgb<u8>, thickness: u32 },
}

/// Decide the overlay for one analyzed frame.
///
/// `flash_phase` is the driver's counter as sampled by the renderer; the
/// red fill is only drawn on its on-ticks.
pub fn plan_overlay(analysis: &FrameAnalysis, flash_phase: u64, config: &RenderConfig) -> Vec<DrawOp> {
    let mut ops: Vec<DrawOp> = analysis
        .detection
        .faces
        .iter()
        .map(|&region| DrawOp::Outline {
            region,
            color: FACE_COLOR,
            thickness: config.box_thickness,
        })
        .chain(analysis.detection.eyes.iter().map(|&region| DrawOp::Outline {
            region,
            color: EYE_COLOR,
            thickness: config.box_thickness,
        }))
        .collect();

    ops.push(DrawOp::Text {
        text: format!(
            "EYES: {} | COUNTER: {}",
            analysis.eye_count(),
            analysis.consecutive_low_eye_frames
        ),
        x: 10,
        y: 30,
        size: config.readout_size,
        color: READOUT_COLOR,
    });

    if analysis.is_alert() {
        if flash_visible(flash_phase) {
            ops.push(DrawOp::Fill {
                color: ALERT_RED,
                alpha: config.overlay_alpha,
            });
        }
        ops.push(DrawOp::Text {
            text: DROWSY_BANNER.to_string(),
            x: 100,
            y: 240,
            size: config.banner_size,
            color: BANNER_WHITE,
        });
        ops.push(DrawOp::Text {
            text: WAKE_BANNER.to_string(),
            x: 150,
            y: 300,
            size: config.banner_size,
            color: BANNER_CYAN,
        });
        ops.push(DrawOp::Border {
            color: ALERT_RED,
            thickness: config.border_thickness,
        });
    } else {
        ops.push(DrawOp::Text {
            text: SAFE_BANNER.to_string(),
            x: 50,
            y: 100,
            size: config.safe_banner_size,
            color: SAFE_GREEN,
        });
    }

    ops
}

/// Draws [`DrawOp`]s onto frames
pub struct Renderer {
    font: Option<FontVec>,
}

impl Renderer {
    pub fn new(config: &RenderConfig) -> Result<Self, MonitorError> {
        let font = match &config.font_path {
            Some(path) => {
                let bytes = std::fs::read(path)?;
                let font = FontVec::try_from_vec(bytes)
                    .map_err(|e| MonitorError::Font(format!("{}: {}", path, e)))?;
                info!("Loaded overlay font {}", path);
                Some(font)
            }
            None => {
                info!("No overlay font configured; banner text disabled");
                None
            }
        };
        Ok(Self { font })
    }

    /// Renderer without text support
    pub fn shapes_only() -> Self {
        Self { font: None }
    }

    pub fn render(&self, frame: &VideoFrame, ops: &[DrawOp]) -> RgbImage {
        let mut canvas = frame
            .to_rgb_image()
            .unwrap_or_else(|| RgbImage::new(frame.width, frame.height));

        for op in ops {
            match op {
                DrawOp::Outline {
                    region,
                    color,
                    thickness,
                } => outline(&mut canvas, region, *color, *thickness),
                DrawOp::Fill { color, alpha } => blend_fill(&mut canvas, *color, *alpha),
                DrawOp::Text {
                    text,
                    x,
                    y,
                    size,
                    color,
                } => {
                    if let Some(font) = &self.font {
                        let top = y - *size as i32;
                        draw_text_mut(&mut canvas, *color, *x, top, *size, font, text);
                    }
                }
                DrawOp::Border { color, thickness } => {
                    let (w, h) = canvas.dimensions();
                    outline(&mut canvas, &BoundingBox::new(0, 0, w, h), *color, *thickness);
                }
            }
        }
        canvas
    }
}

/// Nested hollow rectangles, growing inward
fn outline(canvas: &mut RgbImage, region: &BoundingBox, color: Rgb<u8>, thickness: u32) {
    let (cw, ch) = canvas.dimensions();
    let Some(region) = region.clamp_to(cw, ch) else {
        return;
    };
    for i in 0..thickness {
        let (w, h) = (
            region.width.saturating_sub(2 * i),
            region.height.saturating_sub(2 * i),
        );
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((region.x + i) as i32, (region.y + i) as i32).of_size(w, h);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

fn blend_fill(canvas: &mut RgbImage, color: Rgb<u8>, alpha: f32) {
    if alpha >= 1.0 {
        let (w, h) = canvas.dimensions();
        if w > 0 && h > 0 {
            draw_filled_rect_mut(canvas, Rect::at(0, 0).of_size(w, h), color);
        }
        return;
    }
    let alpha = alpha.max(0.0);
    for pixel in canvas.pixels_mut() {
        for c in 0..3 {
            pixel[c] = (color[c] as f32 * alpha + pixel[c] as f32 * (1.0 - alpha)).round() as u8;
        }
    }
}
