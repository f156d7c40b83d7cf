//! In-process simulated sensors and a headless display for CI and demos.
//!
//! The whole fusion pipeline can run without a LIDAR, a radar, or a browser
//! attached:
//!
//! - [`SimLidar`] ray-casts a 16-channel rotating sensor against an
//!   axis-aligned room.  Rays longer than `max_range` come back with
//!   distance 0, exactly like a real sensor's non-return.
//! - [`SimRadar`] reports a fixed set of targets, optionally orbiting the
//!   radar origin.
//! - [`HeadlessSink`] logs per-scene statistics and can ask to close after a
//!   fixed number of frames.
//!
//! # Example
//!
//! ```rust
//! use rigfuse_hal::{LidarCapture, SimLidar};
//!
//! let mut lidar = SimLidar::new().with_azimuth_step(10.0).with_frame_limit(1);
//! let batch = lidar.next_batch();
//! assert_eq!(batch.len(), 36 * 16);
//! assert!(!lidar.is_running());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rigfuse_perception::DetectionEnvelope;
use rigfuse_perception::angles::yaw;
use rigfuse_types::{CloudTag, LaserReturn, Point3D, RigError, Scene};
use tracing::info;

use crate::capture::LidarCapture;
use crate::display::SceneSink;
use crate::radar::RadarSource;

/// Elevation angles of a 16-channel sensor, −15° to +15° in 2° steps.
pub const SIM_VERTICAL_ANGLES: [f64; 16] = [
    -15.0, -13.0, -11.0, -9.0, -7.0, -5.0, -3.0, -1.0, 1.0, 3.0, 5.0, 7.0, 9.0, 11.0, 13.0, 15.0,
];

// ────────────────────────────────────────────────────────────────────────────
// Simulated LIDAR
// ────────────────────────────────────────────────────────────────────────────

/// An axis-aligned room centred on the sensor, in scene units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimRoom {
    /// Distance from the sensor to the side walls (±x).
    pub half_width: f64,
    /// Distance from the sensor to the front and back walls (±y).
    pub half_depth: f64,
    /// Floor height, below the sensor (negative).
    pub floor: f64,
    /// Ceiling height, above the sensor (positive).
    pub ceiling: f64,
}

impl Default for SimRoom {
    fn default() -> Self {
        Self {
            half_width: 400.0,
            half_depth: 300.0,
            floor: -80.0,
            ceiling: 150.0,
        }
    }
}

impl SimRoom {
    /// Distance from the origin to the first surface along the ray.
    fn cast(&self, azimuth_deg: f64, vertical_deg: f64) -> f64 {
        let (az, el) = (azimuth_deg.to_radians(), vertical_deg.to_radians());
        let dir = [el.cos() * az.sin(), el.cos() * az.cos(), el.sin()];
        let bounds = [
            (-self.half_width, self.half_width),
            (-self.half_depth, self.half_depth),
            (self.floor, self.ceiling),
        ];

        dir.iter()
            .zip(bounds)
            .filter_map(|(&d, (lo, hi))| {
                if d > 0.0 {
                    Some(hi / d)
                } else if d < 0.0 {
                    Some(lo / d)
                } else {
                    None
                }
            })
            .fold(f64::INFINITY, f64::min)
    }
}

/// A simulated 16-channel rotating LIDAR.  Always opens successfully.
pub struct SimLidar {
    id: String,
    room: SimRoom,
    azimuth_step: f64,
    max_range: f64,
    frame_limit: Option<u64>,
    frames: u64,
    open: bool,
}

impl SimLidar {
    /// 1° azimuth resolution, default room, 450-unit range, unlimited frames.
    pub fn new() -> Self {
        Self {
            id: "sim-lidar".to_string(),
            room: SimRoom::default(),
            azimuth_step: 1.0,
            max_range: 450.0,
            frame_limit: None,
            frames: 0,
            open: true,
        }
    }

    /// Horizontal resolution in degrees, clamped to `0.01..=360.0` so every
    /// rotation has at least one column. NaN keeps the 1° default.
    pub fn with_azimuth_step(mut self, degrees: f64) -> Self {
        if !degrees.is_nan() {
            self.azimuth_step = degrees.clamp(0.01, 360.0);
        }
        self
    }

    pub fn with_max_range(mut self, max_range: f64) -> Self {
        self.max_range = max_range;
        self
    }

    pub fn with_room(mut self, room: SimRoom) -> Self {
        self.room = room;
        self
    }

    /// Stop running after `frames` rotations.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }
}

impl Default for SimLidar {
    fn default() -> Self {
        Self::new()
    }
}

impl LidarCapture for SimLidar {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn is_running(&self) -> bool {
        self.open && self.frame_limit.is_none_or(|limit| self.frames < limit)
    }

    fn next_batch(&mut self) -> Vec<LaserReturn> {
        if !self.is_running() {
            return Vec::new();
        }
        self.frames += 1;

        let columns = (360.0 / self.azimuth_step).round() as usize;
        let mut batch = Vec::with_capacity(columns * SIM_VERTICAL_ANGLES.len());
        for col in 0..columns {
            let azimuth = col as f64 * self.azimuth_step;
            for &vertical in &SIM_VERTICAL_ANGLES {
                let hit = self.room.cast(azimuth, vertical);
                let distance = if hit <= self.max_range { hit } else { 0.0 };
                batch.push(LaserReturn::new(distance, azimuth, vertical));
            }
        }
        batch
    }

    fn close(&mut self) {
        self.open = false;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated radar
// ────────────────────────────────────────────────────────────────────────────

/// A simulated radar reporting fixed targets in its own frame.
///
/// With a non-zero orbit rate the targets rotate about the radar's vertical
/// axis as wall-clock time passes after [`start`][RadarSource::start].
pub struct SimRadar {
    id: String,
    targets: Vec<Point3D>,
    orbit_rate: f32,
    envelope: DetectionEnvelope,
    started_at: Option<Instant>,
}

impl SimRadar {
    /// Two stationary targets ahead of the radar.
    pub fn new() -> Self {
        Self::with_targets(vec![
            Point3D::new(50.0, 200.0, 0.0),
            Point3D::new(-80.0, 250.0, 10.0),
        ])
    }

    pub fn with_targets(targets: Vec<Point3D>) -> Self {
        Self {
            id: "sim-radar".to_string(),
            targets,
            orbit_rate: 0.0,
            envelope: DetectionEnvelope::default(),
            started_at: None,
        }
    }

    /// Orbit the targets at `rad_per_sec`.
    pub fn with_orbit_rate(mut self, rad_per_sec: f32) -> Self {
        self.orbit_rate = rad_per_sec;
        self
    }

    pub fn with_envelope(mut self, envelope: DetectionEnvelope) -> Self {
        self.envelope = envelope;
        self
    }
}

impl Default for SimRadar {
    fn default() -> Self {
        Self::new()
    }
}

impl RadarSource for SimRadar {
    fn id(&self) -> &str {
        &self.id
    }

    fn start(&mut self) -> Result<(), RigError> {
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn snapshot(&self) -> Arc<[Point3D]> {
        let Some(started) = self.started_at else {
            return Arc::from(Vec::<Point3D>::new());
        };
        let angle = self.orbit_rate * started.elapsed().as_secs_f32();
        self.targets.iter().map(|&p| yaw(p, angle)).collect()
    }

    fn envelope(&self) -> &DetectionEnvelope {
        &self.envelope
    }

    fn close(&mut self) {
        self.started_at = None;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Headless display
// ────────────────────────────────────────────────────────────────────────────

/// A display that only logs what it would draw.
#[derive(Default)]
pub struct HeadlessSink {
    max_frames: Option<u64>,
    close_flag: Arc<AtomicBool>,
    presented: u64,
    closed: bool,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request close after `frames` scenes have been presented.
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Flag that, once raised by anyone holding a clone, requests close.
    pub fn close_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.close_flag)
    }

    /// Number of scenes presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl SceneSink for HeadlessSink {
    fn present(&mut self, scene: &Scene) -> Result<(), RigError> {
        if self.closed {
            return Err(RigError::Display {
                details: "headless sink is closed".to_string(),
            });
        }
        self.presented += 1;

        let count = |tag: CloudTag| scene.cloud(tag).map_or(0, |c| c.points.len());
        info!(
            frame_id = scene.frame_id,
            lidar = count(CloudTag::Lidar),
            radar = count(CloudTag::RadarAligned),
            gated = count(CloudTag::RadarGated),
            "scene"
        );
        Ok(())
    }

    fn close_requested(&self) -> bool {
        self.closed
            || self.close_flag.load(Ordering::SeqCst)
            || self.max_frames.is_some_and(|max| self.presented >= max)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
