//! Configuration file support for attention-gate.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/attention-gate/config.toml` (lowest priority)
//! - Project-local: `.attention-gate.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};
use std::time::Duration;

use attention_core::ports::{CameraConstraints, Facing};
use attention_core::RefreshClock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Name of the project-local config file.
pub const PROJECT_CONFIG_FILE: &str = ".attention-gate.toml";

/// Hardcoded defaults for values not set anywhere.
pub mod defaults {
    pub const EAR_THRESHOLD: f64 = 0.22;
    pub const READY_TIMEOUT_MS: u64 = 5_000;
    pub const WIDTH: u32 = 640;
    pub const HEIGHT: u32 = 480;
    pub const FACING: &str = "user";
}

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Requested camera parameters.
    pub camera: CameraConfig,
    /// Detection loop settings.
    pub detection: DetectionConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// Camera configuration.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Requested frame width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Requested frame height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Preferred camera: "user" or "environment".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facing: Option<String>,
}

/// Detection loop configuration.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Eye aspect ratio threshold (0.0-1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ear_threshold: Option<f64>,
    /// How long the video surface may take to become ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_timeout_ms: Option<u64>,
    /// Frame clock rate in Hz.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_hz: Option<f64>,
    /// Consecutive failed frames that end the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_consecutive_failures: Option<u32>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print JSON output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/attention-gate/config.toml`
    /// 2. Project-local: `.attention-gate.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored and unparseable files are logged
    /// as warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged values are out of range.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::default();

        // Load XDG config (lowest priority)
        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        // Load project-local config (higher priority, merged)
        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
        Ok(config)
    }

    /// Validate configuration values are within acceptable ranges.
    fn validate(&self) -> Result<(), String> {
        if let Some(t) = self.detection.ear_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(format!("detection.ear_threshold must be 0.0-1.0, got {t}"));
            }
        }
        if let Some(hz) = self.detection.refresh_hz {
            if !(hz.is_finite() && hz > 0.0) {
                return Err(format!("detection.refresh_hz must be positive, got {hz}"));
            }
        }
        if self.camera.width == Some(0) || self.camera.height == Some(0) {
            return Err("camera.width and camera.height must be non-zero".to_string());
        }
        if let Some(ref facing) = self.camera.facing {
            parse_facing(facing)?;
        }
        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        // Camera
        self.camera.width = other.camera.width.or(self.camera.width);
        self.camera.height = other.camera.height.or(self.camera.height);
        self.camera.facing = other.camera.facing.or_else(|| self.camera.facing.take());

        // Detection
        self.detection.ear_threshold = other
            .detection
            .ear_threshold
            .or(self.detection.ear_threshold);
        self.detection.ready_timeout_ms = other
            .detection
            .ready_timeout_ms
            .or(self.detection.ready_timeout_ms);
        self.detection.refresh_hz = other.detection.refresh_hz.or(self.detection.refresh_hz);
        self.detection.max_consecutive_failures = other
            .detection
            .max_consecutive_failures
            .or(self.detection.max_consecutive_failures);

        // Output
        self.output.pretty = other.output.pretty.or(self.output.pretty);
    }

    /// Returns a copy with every unset value replaced by its default.
    #[must_use]
    pub fn effective(&self) -> Self {
        Self {
            camera: CameraConfig {
                width: Some(self.camera.width.unwrap_or(defaults::WIDTH)),
                height: Some(self.camera.height.unwrap_or(defaults::HEIGHT)),
                facing: Some(
                    self.camera
                        .facing
                        .clone()
                        .unwrap_or_else(|| defaults::FACING.to_string()),
                ),
            },
            detection: DetectionConfig {
                ear_threshold: Some(
                    self.detection
                        .ear_threshold
                        .unwrap_or(defaults::EAR_THRESHOLD),
                ),
                ready_timeout_ms: Some(
                    self.detection
                        .ready_timeout_ms
                        .unwrap_or(defaults::READY_TIMEOUT_MS),
                ),
                refresh_hz: Some(
                    self.detection
                        .refresh_hz
                        .unwrap_or(RefreshClock::DEFAULT_HZ),
                ),
                max_consecutive_failures: self.detection.max_consecutive_failures,
            },
            output: OutputConfig {
                pretty: Some(self.output.pretty.unwrap_or(false)),
            },
        }
    }

    /// Camera constraints with fallback to hardcoded defaults.
    #[must_use]
    pub fn constraints(&self) -> CameraConstraints {
        CameraConstraints {
            width: self.camera.width.unwrap_or(defaults::WIDTH),
            height: self.camera.height.unwrap_or(defaults::HEIGHT),
            facing: self
                .camera
                .facing
                .as_deref()
                .and_then(|f| parse_facing(f).ok())
                .unwrap_or_default(),
        }
    }

    /// EAR threshold with fallback to the hardcoded default.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn ear_threshold(&self) -> f32 {
        self.detection
            .ear_threshold
            .unwrap_or(defaults::EAR_THRESHOLD) as f32
    }

    /// Ready timeout with fallback to the hardcoded default.
    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(
            self.detection
                .ready_timeout_ms
                .unwrap_or(defaults::READY_TIMEOUT_MS),
        )
    }
}

/// Parses a camera facing name.
fn parse_facing(s: &str) -> Result<Facing, String> {
    match s {
        "user" => Ok(Facing::User),
        "environment" => Ok(Facing::Environment),
        other => Err(format!(
            "camera.facing must be 'user' or 'environment', got '{other}'"
        )),
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("attention-gate").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.attention-gate.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(PROJECT_CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
