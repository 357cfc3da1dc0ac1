//! End-to-end monitor loop tests with scripted detectors

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alerting::AlertStatus;
use camera_capture::{
    BlankSource, CameraConfig, CameraError, FrameSource, MemorySource, VideoFrame,
};
use dms::{DetectionResult, DmsConfig, DmsModule, EyeStateDetector, ScriptedDetector};
use image::RgbImage;
use monitor::{
    run, run_monitor, DisplayEvent, DisplaySink, InputMode, Monitor, MonitorConfig, MonitorError,
    OutputMode, RenderConfig, Renderer, StopReason,
};

/// Shared log of what the sink was shown
#[derive(Default)]
struct Recording {
    red_center: Vec<bool>,
    flash_phases: Vec<u64>,
}

struct RecordingSink {
    log: Arc<Mutex<Recording>>,
    status: Arc<AlertStatus>,
    stop_after: Option<usize>,
}

impl DisplaySink for RecordingSink {
    fn show(&mut self, image: &RgbImage) -> Result<DisplayEvent, MonitorError> {
        let mut log = self.log.lock().unwrap();
        log.red_center.push(image.get_pixel(40, 30)[0] > 100);
        log.flash_phases.push(self.status.flash_phase());
        if self.stop_after == Some(log.red_center.len()) {
            return Ok(DisplayEvent::Stop);
        }
        Ok(DisplayEvent::Continue)
    }
}

fn camera() -> CameraConfig {
    CameraConfig {
        width: 64,
        height: 48,
        ..Default::default()
    }
}

fn scenario() -> Vec<usize> {
    std::iter::repeat(2)
        .take(10)
        .chain(std::iter::repeat(0).take(40))
        .chain(std::iter::repeat(2).take(5))
        .collect()
}

fn monitor_with(
    source: Box<dyn FrameSource>,
    detector: Box<dyn EyeStateDetector>,
    threshold: u32,
    stop_after: Option<usize>,
) -> (Monitor, Arc<AlertStatus>, Arc<Mutex<Recording>>) {
    let status = Arc::new(AlertStatus::new());
    let log = Arc::new(Mutex::new(Recording::default()));
    let config = DmsConfig {
        eyes_threshold: threshold,
        ..Default::default()
    };
    let sink = RecordingSink {
        log: log.clone(),
        status: status.clone(),
        stop_after,
    };
    let monitor = Monitor::new(
        source,
        DmsModule::with_detector(&config, detector),
        status.clone(),
        Renderer::shapes_only(),
        RenderConfig::default(),
        Box::new(sink),
    );
    (monitor, status, log)
}

#[test]
fn test_scripted_scenario_alerts_once() {
    let script = scenario();
    let (mut monitor, status, log) = monitor_with(
        Box::new(BlankSource::new(&camera(), script.len())),
        Box::new(ScriptedDetector::new(script)),
        35,
        None,
    );

    let summary = monitor.run(&AtomicBool::new(false)).unwrap();
    assert_eq!(summary.frames, 55);
    assert_eq!(summary.alerts_raised, 1);
    assert_eq!(summary.reason, StopReason::EndOfStream);
    assert!(!status.is_alert_active());

    // Flash phase stays 0 without a driver, so every alert frame is flashed.
    let log = log.lock().unwrap();
    for (i, &red) in log.red_center.iter().enumerate() {
        let frame = i + 1;
        assert_eq!(red, (46..=50).contains(&frame), "frame {frame}");
    }
}

#[test]
fn test_zero_length_stream() {
    let (mut monitor, status, log) = monitor_with(
        Box::new(BlankSource::new(&camera(), 0)),
        Box::new(ScriptedDetector::default()),
        35,
        None,
    );
    let summary = monitor.run(&AtomicBool::new(false)).unwrap();
    assert_eq!(summary.frames, 0);
    assert_eq!(summary.alerts_raised, 0);
    assert_eq!(summary.reason, StopReason::EndOfStream);
    assert!(!status.is_alert_active());
    assert!(log.lock().unwrap().red_center.is_empty());
}

#[test]
fn test_stop_flag_checked_before_each_frame() {
    let (mut monitor, _, _) = monitor_with(
        Box::new(BlankSource::new(&camera(), 10)),
        Box::new(ScriptedDetector::new(vec![2; 10])),
        35,
        None,
    );
    let summary = monitor.run(&AtomicBool::new(true)).unwrap();
    assert_eq!(summary.frames, 0);
    assert_eq!(summary.reason, StopReason::StopRequested);
}

#[test]
fn test_stop_key_ends_loop() {
    let (mut monitor, _, log) = monitor_with(
        Box::new(BlankSource::new(&camera(), 10)),
        Box::new(ScriptedDetector::new(vec![2; 10])),
        35,
        Some(3),
    );
    let summary = monitor.run(&AtomicBool::new(false)).unwrap();
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.reason, StopReason::StopRequested);
    assert_eq!(log.lock().unwrap().red_center.len(), 3);
}

#[test]
fn test_recorded_frames_are_mirrored_before_detection() {
    // Bright left half; after mirroring only the right half is bright.
    let image = image::RgbImage::from_fn(64, 48, |x, _| {
        if x < 32 {
            image::Rgb([200, 200, 200])
        } else {
            image::Rgb([0, 0, 0])
        }
    });
    let frames = (0..3).map(|seq| VideoFrame::from_rgb_image(image.clone(), 0, seq));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (mut monitor, status, _) = monitor_with(
        Box::new(MemorySource::new(frames)),
        Box::new(BrightSideDetector { seen: seen.clone() }),
        1,
        None,
    );

    let summary = monitor.run(&AtomicBool::new(false)).unwrap();
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.alerts_raised, 1);
    assert!(status.is_alert_active());
    assert_eq!(*seen.lock().unwrap(), vec![false, false, false]);
}

/// Records whether the left edge is bright and reports no eyes
struct BrightSideDetector {
    seen: Arc<Mutex<Vec<bool>>>,
}

impl EyeStateDetector for BrightSideDetector {
    fn detect(&mut self, frame: &VideoFrame) -> DetectionResult {
        self.seen.lock().unwrap().push(frame.data[0] > 100);
        DetectionResult::default()
    }
}

/// Two good frames, then a read failure
struct FlakySource {
    served: usize,
}

impl FrameSource for FlakySource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.served == 2 {
            return Err(CameraError::Read {
                index: 2,
                reason: "device unplugged".into(),
            });
        }
        self.served += 1;
        Ok(Some(VideoFrame::blank(64, 48, self.served as u32)))
    }
}

#[test]
fn test_read_failure_is_end_of_stream() {
    let (mut monitor, _, _) = monitor_with(
        Box::new(FlakySource { served: 0 }),
        Box::new(ScriptedDetector::new(vec![0; 5])),
        35,
        None,
    );
    let summary = monitor.run(&AtomicBool::new(false)).unwrap();
    assert_eq!(summary.frames, 2);
    assert_eq!(summary.reason, StopReason::EndOfStream);
}

/// Sees no eyes and takes its time about it
struct SlowDetector;

impl EyeStateDetector for SlowDetector {
    fn detect(&mut self, _frame: &VideoFrame) -> DetectionResult {
        std::thread::sleep(Duration::from_millis(250));
        DetectionResult::default()
    }
}

#[test]
fn test_flash_keeps_cadence_with_slow_detector() {
    let (monitor, status, log) = monitor_with(
        Box::new(BlankSource::new(&camera(), 4)),
        Box::new(SlowDetector),
        0,
        None,
    );

    let summary = run_monitor(monitor, status.clone(), &MonitorConfig::default()).unwrap();
    assert_eq!(summary.frames, 4);
    assert_eq!(summary.alerts_raised, 1);

    let log = log.lock().unwrap();
    let first = log.flash_phases[0];
    let last = log.flash_phases[3];
    assert!(last >= first + 2, "flash phases {:?}", log.flash_phases);
    assert_eq!(status.flash_phase(), 0);
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("drowsy-{}-{}", name, std::process::id()))
}

#[test]
fn test_run_script_writes_frames() {
    let script_path = temp_path("script.txt");
    let out_dir = temp_path("frames");
    let script: Vec<String> = scenario().iter().map(|c| c.to_string()).collect();
    std::fs::write(&script_path, script.join(" ")).unwrap();

    let mut config = MonitorConfig::default();
    config.camera = camera();

    let summary = run(
        &config,
        &InputMode::Script(script_path.clone()),
        &OutputMode::Directory(out_dir.clone()),
    )
    .unwrap();
    assert_eq!(summary.frames, 55);
    assert_eq!(summary.alerts_raised, 1);
    assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 55);

    std::fs::remove_file(&script_path).ok();
    std::fs::remove_dir_all(&out_dir).ok();
}

#[test]
fn test_missing_frame_directory_is_fatal() {
    let result = run(
        &MonitorConfig::default(),
        &InputMode::Frames("/nonexistent/drowsy-frames".into()),
        &OutputMode::Discard,
    );
    assert!(matches!(result, Err(MonitorError::Camera(CameraError::Open(_)))));
}

#[test]
fn test_frames_without_models_is_config_error() {
    let dir = temp_path("empty-frames");
    std::fs::create_dir_all(&dir).unwrap();
    let result = run(&MonitorConfig::default(), &InputMode::Frames(dir.clone()), &OutputMode::Discard);
    assert!(matches!(result, Err(MonitorError::Dms(dms::DmsError::Config(_)))));
    std::fs::remove_dir_all(&dir).ok();
}
