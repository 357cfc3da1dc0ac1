//! Drowsiness Monitor
//!
//! Wires the frame source, the DMS state machine, the flash driver and the
//! overlay renderer into one process.

pub mod config;
pub mod display;
pub mod monitor;
pub mod render;

pub use crate::config::{DisplayConfig, LoggingConfig, MonitorConfig};
pub use display::{DisplayEvent, DisplaySink, FrameDirSink, NullSink};
pub use monitor::{Monitor, RunSummary, StopReason};
pub use render::{plan_overlay, DrawOp, RenderConfig, Renderer};

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alerting::{AlertDriver, AlertStatus};
use camera_capture::{BlankSource, CameraError, FrameSource, ImageDirSource};
use dms::{DmsError, DmsModule, ScriptedDetector};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("DMS error: {0}")]
    Dms(#[from] DmsError),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Display error: {0}")]
    Display(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Where frames and eye counts come from
#[derive(Debug, Clone)]
pub enum InputMode {
    /// Directory of recorded frames, analyzed with the configured models
    Frames(PathBuf),
    /// File of whitespace-separated eye counts replayed on blank frames
    Script(PathBuf),
}

/// Where annotated frames go
#[derive(Debug, Clone)]
pub enum OutputMode {
    Discard,
    Directory(PathBuf),
    #[cfg(feature = "window")]
    Window,
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), MonitorError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| MonitorError::Logging(e.to_string()))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| MonitorError::Logging(e.to_string()))
}

/// Build the monitor loop for an input and output
pub fn build_monitor(
    config: &MonitorConfig,
    input: &InputMode,
    output: &OutputMode,
    status: Arc<AlertStatus>,
) -> Result<Monitor, MonitorError> {
    let (source, dms): (Box<dyn FrameSource>, DmsModule) = match input {
        InputMode::Frames(dir) => {
            let source: Box<dyn FrameSource> = Box::new(ImageDirSource::open(dir, &config.camera)?);
            (source, DmsModule::new(&config.dms)?)
        }
        InputMode::Script(path) => {
            let detector = ScriptedDetector::parse(&std::fs::read_to_string(path)?)?;
            info!("Replaying {} scripted frames from {}", detector.remaining(), path.display());
            let source: Box<dyn FrameSource> =
                Box::new(BlankSource::new(&config.camera, detector.remaining()));
            (source, DmsModule::with_detector(&config.dms, Box::new(detector)))
        }
    };

    let sink: Box<dyn DisplaySink> = match output {
        OutputMode::Discard => Box::new(NullSink),
        OutputMode::Directory(dir) => Box::new(FrameDirSink::create(dir)?),
        #[cfg(feature = "window")]
        OutputMode::Window => Box::new(display::WindowSink::open(
            &config.display.title,
            config.camera.width,
            config.camera.height,
        )?),
    };

    let renderer = Renderer::new(&config.render)?;
    Ok(Monitor::new(source, dms, status, renderer, config.render.clone(), sink)
        .with_mirror(config.camera.mirror))
}

/// Run a monitor with its flash driver until end of stream, the stop key or
/// Ctrl-C. The driver is stopped through the same signal.
pub fn run_monitor(
    mut monitor: Monitor,
    status: Arc<AlertStatus>,
    config: &MonitorConfig,
) -> Result<RunSummary, MonitorError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("alert-driver")
        .enable_all()
        .build()?;

    let stop = Arc::new(AtomicBool::new(false));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let driver = runtime.spawn(AlertDriver::new(status, config.alert.clone()).run(shutdown_rx));

    let ctrl_c_stop = stop.clone();
    let mut ctrl_c_shutdown = shutdown_tx.subscribe();
    runtime.spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("Ctrl-C received, stopping");
                    ctrl_c_stop.store(true, Ordering::SeqCst);
                }
                Err(e) => warn!("Ctrl-C handler unavailable: {}", e),
            },
            _ = ctrl_c_shutdown.changed() => {}
        }
    });

    let result = monitor.run(&stop);

    let _ = shutdown_tx.send(true);
    if let Err(e) = runtime.block_on(driver) {
        warn!("Alert driver ended abnormally: {}", e);
    }
    runtime.shutdown_timeout(Duration::from_millis(500));

    result
}

/// Build and run in one call
pub fn run(
    config: &MonitorConfig,
    input: &InputMode,
    output: &OutputMode,
) -> Result<RunSummary, MonitorError> {
    let status = Arc::new(AlertStatus::new());
    let monitor = build_monitor(config, input, output, status.clone())?;
    run_monitor(monitor, status, config)
}
