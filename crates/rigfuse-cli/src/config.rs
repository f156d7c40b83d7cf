//! Rig configuration – reads/writes `~/.rigfuse/config.toml`.
//!
//! Every field has a default, so a missing file (or a partial one) yields a
//! runnable simulated rig.

use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rigfuse_perception::{DetectionEnvelope, EulerAngles, MountTransform};
use rigfuse_runtime::FusionLoopConfig;
use rigfuse_types::{MountAxes, MountOffset, RigError};
use serde::{Deserialize, Serialize};

fn config_error(msg: String) -> RigError {
    RigError::Config(msg)
}

// ─────────────────────────────────────────────────────────────────────────────
// Source selection
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    #[default]
    Simulated,
    Replay,
    Udp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadarKind {
    #[default]
    Simulated,
    Tcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerKind {
    #[default]
    Cockpit,
    Headless,
}

impl std::fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureKind::Simulated => write!(f, "simulated"),
            CaptureKind::Replay => write!(f, "replay"),
            CaptureKind::Udp => write!(f, "udp"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `[capture]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default)]
    pub kind: CaptureKind,

    /// Recording to replay (`kind = "replay"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Bind address for `kind = "udp"`.
    #[serde(default = "default_capture_address")]
    pub address: IpAddr,

    #[serde(default = "default_capture_port")]
    pub port: u16,

    /// Longest a UDP read may block before the tick is skipped.
    #[serde(default = "default_capture_timeout_ms")]
    pub timeout_ms: u64,

    /// Horizontal resolution of the simulated sensor.
    #[serde(default = "default_azimuth_step_deg")]
    pub azimuth_step_deg: f64,

    /// Stop the simulated sensor after this many rotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_limit: Option<u64>,
}

/// `[radar.envelope]`, fields of view are full angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    #[serde(default)]
    pub min_range: f32,
    #[serde(default = "default_max_range")]
    pub max_range: f32,
    #[serde(default = "default_azimuth_fov_deg")]
    pub azimuth_fov_deg: f32,
    #[serde(default = "default_elevation_fov_deg")]
    pub elevation_fov_deg: f32,
}

/// `[radar]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarConfig {
    #[serde(default)]
    pub kind: RadarKind,
    #[serde(default = "default_radar_port")]
    pub port: u16,
    #[serde(default)]
    pub envelope: EnvelopeConfig,
}

/// `[mount]` – radar position relative to the LIDAR, in scene units.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MountConfig {
    #[serde(default)]
    pub up: f32,
    #[serde(default)]
    pub right: f32,
    #[serde(default)]
    pub back: f32,
    #[serde(default)]
    pub axes: MountAxes,
}

/// `[lidar.correction]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrectionConfig {
    #[serde(default)]
    pub yaw_deg: f32,
    #[serde(default)]
    pub pitch_deg: f32,
    #[serde(default)]
    pub roll_deg: f32,
}

/// `[lidar]`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LidarConfig {
    #[serde(default)]
    pub correction: CorrectionConfig,
}

/// `[viewer]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub kind: ViewerKind,
    #[serde(default = "default_viewer_port")]
    pub port: u16,
    /// Headless only: request close after this many scenes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_frames: Option<u64>,
}

/// Persisted rig configuration stored in `~/.rigfuse/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Pause after each rendered frame.
    #[serde(default = "default_frame_period_ms")]
    pub frame_period_ms: u64,

    /// Consecutive empty rotations before warning about a stalled capture.
    #[serde(default = "default_stall_warn_ticks")]
    pub stall_warn_ticks: u64,

    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub radar: RadarConfig,
    #[serde(default)]
    pub mount: MountConfig,
    #[serde(default)]
    pub lidar: LidarConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

fn default_frame_period_ms() -> u64 {
    43
}
fn default_stall_warn_ticks() -> u64 {
    50
}
fn default_capture_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_capture_port() -> u16 {
    2368
}
fn default_capture_timeout_ms() -> u64 {
    100
}
fn default_azimuth_step_deg() -> f64 {
    1.0
}
fn default_max_range() -> f32 {
    2000.0
}
fn default_azimuth_fov_deg() -> f32 {
    120.0
}
fn default_elevation_fov_deg() -> f32 {
    30.0
}
fn default_radar_port() -> u16 {
    rigfuse_hal::DEFAULT_RADAR_PORT
}
fn default_viewer_port() -> u16 {
    rigfuse_cockpit::DEFAULT_PORT
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            kind: CaptureKind::default(),
            path: None,
            address: default_capture_address(),
            port: default_capture_port(),
            timeout_ms: default_capture_timeout_ms(),
            azimuth_step_deg: default_azimuth_step_deg(),
            frame_limit: None,
        }
    }
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            min_range: 0.0,
            max_range: default_max_range(),
            azimuth_fov_deg: default_azimuth_fov_deg(),
            elevation_fov_deg: default_elevation_fov_deg(),
        }
    }
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            kind: RadarKind::default(),
            port: default_radar_port(),
            envelope: EnvelopeConfig::default(),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            kind: ViewerKind::default(),
            port: default_viewer_port(),
            max_frames: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_period_ms: default_frame_period_ms(),
            stall_warn_ticks: default_stall_warn_ticks(),
            capture: CaptureConfig::default(),
            radar: RadarConfig::default(),
            mount: MountConfig::default(),
            lidar: LidarConfig::default(),
            viewer: ViewerConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Derived runtime values
// ─────────────────────────────────────────────────────────────────────────────

impl EnvelopeConfig {
    pub fn to_envelope(&self) -> DetectionEnvelope {
        DetectionEnvelope::from_degrees(
            self.min_range,
            self.max_range,
            self.azimuth_fov_deg,
            self.elevation_fov_deg,
        )
    }
}

impl MountConfig {
    pub fn to_transform(&self) -> MountTransform {
        MountTransform::new(MountOffset::new(self.up, self.right, self.back), self.axes)
    }
}

impl Config {
    /// The loop-level settings handed to [`rigfuse_runtime::FusionLoop`].
    pub fn fusion_loop_config(&self) -> FusionLoopConfig {
        let c = self.lidar.correction;
        FusionLoopConfig {
            frame_period: Duration::from_millis(self.frame_period_ms),
            correction: EulerAngles::from_degrees(c.yaw_deg, c.pitch_deg, c.roll_deg),
            mount: self.mount.to_transform(),
            stall_warn_ticks: self.stall_warn_ticks,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Load / save
// ─────────────────────────────────────────────────────────────────────────────

/// `$RIGFUSE_CONFIG` if set, otherwise `~/.rigfuse/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(explicit) = std::env::var("RIGFUSE_CONFIG") {
        return PathBuf::from(explicit);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".rigfuse").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, RigError> {
    load_from(&config_path())
}

/// Load the config from a specific path, with environment overrides applied.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, RigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| config_error(format!("failed to read config at {}: {e}", path.display())))?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| config_error(format!("failed to parse {}: {e}", path.display())))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Defaults with environment overrides applied, for when no file exists.
pub fn defaults_with_env() -> Config {
    let mut cfg = Config::default();
    apply_env_overrides(&mut cfg);
    cfg
}

/// Apply `RIGFUSE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `RIGFUSE_CAPTURE_FILE` | `capture.path`, and forces `capture.kind = "replay"` |
/// | `RIGFUSE_RADAR_PORT` | `radar.port` |
/// | `RIGFUSE_VIEWER_PORT` | `viewer.port` |
/// | `RIGFUSE_FRAME_PERIOD_MS` | `frame_period_ms` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("RIGFUSE_CAPTURE_FILE")
        && !v.is_empty()
    {
        cfg.capture.kind = CaptureKind::Replay;
        cfg.capture.path = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("RIGFUSE_RADAR_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.radar.port = port;
    }
    if let Ok(v) = std::env::var("RIGFUSE_VIEWER_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.viewer.port = port;
    }
    if let Ok(v) = std::env::var("RIGFUSE_FRAME_PERIOD_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.frame_period_ms = ms;
    }
}

/// Save the config to disk, creating the parent directory if necessary.
pub fn save(cfg: &Config) -> Result<PathBuf, RigError> {
    let path = config_path();
    save_to(cfg, &path)?;
    Ok(path)
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), RigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| config_error(format!("failed to create config directory: {e}")))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| config_error(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw)
        .map_err(|e| config_error(format!("failed to write config at {}: {e}", path.display())))
}
