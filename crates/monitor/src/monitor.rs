//! Per-frame monitor loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alerting::AlertStatus;
use camera_capture::FrameSource;
use dms::{DmsModule, Transition};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::display::{DisplayEvent, DisplaySink};
use crate::render::{plan_overlay, RenderConfig, Renderer};
use crate::MonitorError;

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Source ran out of frames (or failed to deliver one)
    EndOfStream,
    /// Stop key, closed window or Ctrl-C
    StopRequested,
}

/// Totals for one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub alerts_raised: u64,
    pub reason: StopReason,
}

/// Acquire -> detect -> decide -> render -> display, once per frame
pub struct Monitor {
    source: Box<dyn FrameSource>,
    dms: DmsModule,
    status: Arc<AlertStatus>,
    renderer: Renderer,
    render_config: RenderConfig,
    sink: Box<dyn DisplaySink>,
    mirror: bool,
}

impl Monitor {
    pub fn new(
        source: Box<dyn FrameSource>,
        dms: DmsModule,
        status: Arc<AlertStatus>,
        renderer: Renderer,
        render_config: RenderConfig,
        sink: Box<dyn DisplaySink>,
    ) -> Self {
        Self {
            source,
            dms,
            status,
            renderer,
            render_config,
            sink,
            mirror: true,
        }
    }

    /// Mirror frames before detection (on by default)
    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Run until end of stream or until `stop` is set.
    ///
    /// Only display failures are errors; a failed frame read ends the
    /// stream.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<RunSummary, MonitorError> {
        let mut frames = 0u64;
        let mut alerts_raised = 0u64;

        let reason = loop {
            if stop.load(Ordering::SeqCst) {
                break StopReason::StopRequested;
            }

            let mut frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::EndOfStream,
                Err(e) => {
                    warn!("Frame acquisition failed, ending stream: {}", e);
                    break StopReason::EndOfStream;
                }
            };
            if self.mirror {
                frame.flip_horizontal();
            }

            let analysis = self.dms.analyze(&frame);
            self.status.set_alert_active(analysis.is_alert());
            frames += 1;

            metrics::counter!("drowsiness_frames_total").increment(1);
            metrics::gauge!("drowsiness_low_eye_frames").set(analysis.consecutive_low_eye_frames as f64);

            match analysis.transition {
                Some(Transition::Raised) => {
                    alerts_raised += 1;
                    metrics::counter!("drowsiness_alerts_total").increment(1);
                    warn!(
                        "DROWSINESS DETECTED at frame {} ({} low-eye frames)",
                        analysis.sequence, analysis.consecutive_low_eye_frames
                    );
                }
                Some(Transition::Cleared) => {
                    info!("Driver alert again at frame {}", analysis.sequence);
                }
                None => {}
            }

            let flash_phase = self.status.flash_phase();
            debug!(
                "Frame {}: eyes={} counter={} state={:?} flash={}",
                analysis.sequence,
                analysis.eye_count(),
                analysis.consecutive_low_eye_frames,
                analysis.alert_state,
                flash_phase
            );

            let ops = plan_overlay(&analysis, flash_phase, &self.render_config);
            let image = self.renderer.render(&frame, &ops);
            if self.sink.show(&image)? == DisplayEvent::Stop {
                info!("Stop key pressed");
                break StopReason::StopRequested;
            }
        };

        self.status.set_alert_active(false);
        info!(
            "Monitor stopped after {} frames ({} alerts): {:?}",
            frames, alerts_raised, reason
        );

        Ok(RunSummary {
            frames,
            alerts_raised,
            reason,
        })
    }
}
