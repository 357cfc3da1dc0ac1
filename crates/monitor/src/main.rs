//! Drowsiness Monitor - Main Entry Point

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use monitor::{init_logging, run, InputMode, MonitorConfig, OutputMode};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "drowsiness-monitor", version, about = "Sustained eye-closure monitor with flashing visual alerts")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of frames to analyze
    #[arg(long, conflicts_with = "script", required_unless_present = "script")]
    frames: Option<PathBuf>,

    /// Replay whitespace-separated eye counts instead of running detection
    #[arg(long)]
    script: Option<PathBuf>,

    /// Write annotated frames into this directory
    #[arg(long)]
    output: Option<PathBuf>,

    /// Show a preview window (ESC to exit)
    #[cfg(feature = "window")]
    #[arg(long, conflicts_with = "output")]
    window: bool,
}

impl Args {
    fn input(&self) -> anyhow::Result<InputMode> {
        match (&self.frames, &self.script) {
            (_, Some(script)) => Ok(InputMode::Script(script.clone())),
            (Some(frames), None) => Ok(InputMode::Frames(frames.clone())),
            (None, None) => anyhow::bail!("either --frames or --script is required"),
        }
    }

    #[cfg(feature = "window")]
    fn output(&self) -> OutputMode {
        if self.window {
            return OutputMode::Window;
        }
        self.file_output()
    }

    #[cfg(not(feature = "window"))]
    fn output(&self) -> OutputMode {
        self.file_output()
    }

    fn file_output(&self) -> OutputMode {
        match &self.output {
            Some(dir) => OutputMode::Directory(dir.clone()),
            None => OutputMode::Discard,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = MonitorConfig::load(args.config.as_deref()).context("loading configuration")?;
    init_logging(&config.logging)?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Alert after {} consecutive frames with fewer than two eyes visible",
        config.dms.alert_after_frames()
    );
    info!("Press ESC in the preview window or Ctrl-C to exit");

    // Fatal errors are reported once, by the `anyhow` return
    let input = args.input()?;
    let summary = run(&config, &input, &args.output())?;

    info!(
        "Program ended: {} frames, {} alerts, {:?}",
        summary.frames, summary.alerts_raised, summary.reason
    );
    Ok(())
}
