//! Watch command - run a detection session over a recorded camera feed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use attention_adapters::{sidecar_provider, DirectoryCamera};
use attention_core::{
    DetectionFrame, Detector, DetectorConfig, FrameSurface, LoopState, RefreshClock,
};
use clap::Args;
use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, info, warn};

use super::ExitCode;
use crate::config::AppConfig;
use crate::output::JsonFrameOutput;

/// How often the main thread re-checks stop conditions while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Parse and validate a threshold value (0.0-1.0).
fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Parse and validate a frame limit of at least one.
fn parse_frame_limit(s: &str) -> Result<u64, String> {
    let value: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid frame count"))?;
    if value == 0 {
        Err("frame limit must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

/// Parse and validate a positive rate.
fn parse_rate(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{value} must be a positive rate"))
    }
}

/// Arguments for a detection session.
#[derive(Args, Clone, Default)]
pub struct WatchArgs {
    /// Directory of recorded frames to replay as the camera
    #[arg(long, value_name = "DIR")]
    pub frames: Option<PathBuf>,

    /// Directory of `<frame>.landmarks.json` annotations (defaults to --frames)
    #[arg(long, value_name = "DIR")]
    pub landmarks: Option<PathBuf>,

    /// Eye aspect ratio threshold (0.0-1.0)
    #[arg(long, value_parser = parse_threshold)]
    pub ear_threshold: Option<f32>,

    /// Frame clock rate in Hz
    #[arg(long, value_parser = parse_rate)]
    pub refresh_hz: Option<f64>,

    /// End the session after this many consecutive failed frames
    #[arg(long, value_name = "N")]
    pub max_consecutive_failures: Option<u32>,

    /// Stop after this many frames
    #[arg(long, value_name = "N", value_parser = parse_frame_limit)]
    pub max_frames: Option<u64>,

    /// Stop at the first frame with open eyes; exit 1 if none is seen
    #[arg(long)]
    pub until_attentive: bool,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Restart the recording after its last frame
    #[arg(long = "loop")]
    pub looping: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl WatchArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in `AppConfig` accessors)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    #[must_use]
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        args.ear_threshold = args.ear_threshold.or(Some(config.ear_threshold()));
        args.refresh_hz = args.refresh_hz.or(config.detection.refresh_hz);
        args.max_consecutive_failures = args
            .max_consecutive_failures
            .or(config.detection.max_consecutive_failures);
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        args
    }

    fn detector_config(&self, config: &AppConfig) -> DetectorConfig {
        DetectorConfig::default()
            .with_ear_threshold(self.ear_threshold.unwrap_or_else(|| config.ear_threshold()))
            .with_constraints(config.constraints())
            .with_ready_timeout(config.ready_timeout())
            .with_max_consecutive_failures(self.max_consecutive_failures)
    }

    fn clock(&self) -> RefreshClock {
        self.refresh_hz
            .map_or_else(RefreshClock::default, RefreshClock::new)
    }
}

/// Result of running the watch command.
#[allow(dead_code)] // Fields exposed for programmatic use
pub struct WatchResult {
    /// Number of frames written.
    pub frames: u64,
    /// Whether any frame showed open eyes.
    pub attentive: bool,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Why the main loop stopped waiting for frames.
#[derive(Debug)]
enum Outcome {
    Attentive,
    FrameLimit,
    Exhausted,
    TimedOut,
    Failed(String),
    Ended,
}

/// Run the watch command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
pub fn run(args: &WatchArgs, config: &AppConfig) -> Result<WatchResult> {
    let Some(frames_dir) = args.frames.clone() else {
        anyhow::bail!("No frame directory specified. Use --frames <DIR>");
    };
    let landmarks_dir = args.landmarks.clone().unwrap_or_else(|| frames_dir.clone());
    info!(
        "Watching {} with landmarks from {}",
        frames_dir.display(),
        landmarks_dir.display()
    );

    let camera = Arc::new(DirectoryCamera::new(frames_dir).with_looping(args.looping));
    let detector = Detector::new(camera.clone(), Arc::new(sidecar_provider(landmarks_dir)))
        .with_clock(Arc::new(args.clock()))
        .with_config(args.detector_config(config));
    debug!("Detector config: {:?}", detector.config());

    // Frames are printed here, not on the worker, so nothing past a stop
    // condition reaches stdout.
    let output = JsonFrameOutput::stdout(args.pretty);
    let (tx, rx) = crossbeam_channel::unbounded::<DetectionFrame>();
    let sink = move |frame: DetectionFrame| {
        let _ = tx.send(frame);
    };

    let surface = Arc::new(FrameSurface::new("attention-gate"));
    let session = detector.start(surface, sink)?;

    let deadline = args
        .timeout_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut frames = 0u64;
    let mut attentive = false;

    let outcome = loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break Outcome::TimedOut;
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(frame) => {
                frames += 1;
                if let Err(e) = output.write(&frame) {
                    warn!("Failed to write frame: {e:#}");
                }
                if let LoopState::Failed(reason) = session.state() {
                    break Outcome::Failed(reason.to_string());
                }
                if frame.eyes_open {
                    attentive = true;
                    if args.until_attentive {
                        break Outcome::Attentive;
                    }
                }
                if args.max_frames.is_some_and(|max| frames >= max) {
                    break Outcome::FrameLimit;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                // Frames are sent before the next sample marks the end.
                if camera.is_exhausted() && rx.is_empty() {
                    break Outcome::Exhausted;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                break match session.state() {
                    LoopState::Failed(reason) => Outcome::Failed(reason.to_string()),
                    _ => Outcome::Ended,
                };
            }
        }
    };

    session.stop();
    debug!("Session ended: {:?} after {} frames", outcome, frames);

    let exit_code = match outcome {
        Outcome::Failed(reason) => {
            eprintln!("error: {reason}");
            ExitCode::Error
        }
        _ if args.until_attentive && !attentive => {
            info!("Attention not confirmed after {} frames", frames);
            ExitCode::NotAttentive
        }
        _ => ExitCode::Success,
    };

    Ok(WatchResult {
        frames,
        attentive,
        exit_code,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("0.25").unwrap(), 0.25);
        assert!(parse_threshold("1.5").unwrap_err().contains("not in 0.0..=1.0"));
        assert!(parse_threshold("abc").unwrap_err().contains("not a valid number"));
    }

    #[test]
    fn test_parse_frame_limit() {
        assert_eq!(parse_frame_limit("5").unwrap(), 5);
        assert!(parse_frame_limit("0").unwrap_err().contains("at least 1"));
        assert!(parse_frame_limit("-1").is_err());
        assert!(parse_frame_limit("many").is_err());
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("30").unwrap(), 30.0);
        assert!(parse_rate("0").is_err());
        assert!(parse_rate("-5").is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let config: AppConfig = toml::from_str(
            r"
[detection]
ear_threshold = 0.3
refresh_hz = 10.0
max_consecutive_failures = 4

[output]
pretty = true
",
        )
        .unwrap();
        let args = WatchArgs {
            ear_threshold: Some(0.18),
            ..WatchArgs::default()
        };

        let merged = WatchArgs::with_config(args, &config);

        assert_eq!(merged.ear_threshold, Some(0.18));
        assert_eq!(merged.refresh_hz, Some(10.0));
        assert_eq!(merged.max_consecutive_failures, Some(4));
        assert!(merged.pretty);
    }

    #[test]
    fn test_detector_config_from_layers() {
        let config: AppConfig = toml::from_str(
            r"
[camera]
width = 320
height = 240

[detection]
ready_timeout_ms = 750
",
        )
        .unwrap();
        let args = WatchArgs::with_config(WatchArgs::default(), &config);
        let detector = args.detector_config(&config);

        assert!((detector.ear_threshold - 0.22).abs() < 1e-6);
        assert_eq!(detector.constraints.width, 320);
        assert_eq!(detector.ready_timeout, Duration::from_millis(750));
        assert!(detector.max_consecutive_failures.is_none());
    }
}
