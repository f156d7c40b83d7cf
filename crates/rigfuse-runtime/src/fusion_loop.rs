//! [`FusionLoop`] – the per-frame fusion driver.
//!
//! Each tick while **Running**:
//!
//! 1. **Stop check** – a close request from the display, or an exhausted
//!    capture, moves the loop to **Stopped**.
//! 2. **Radar** – take the radar's current snapshot (never blocks).
//! 3. **LIDAR** – pull the next rotation.  An empty batch skips the rest of
//!    the tick; the loop retries on the next one.
//! 4. **Fuse** – build the LIDAR frame, align the radar snapshot, gate the
//!    LIDAR points through the radar envelope.
//! 5. **Present** – hand a fresh three-cloud [`Scene`] to the display.
//!
//! [`FusionLoop::run`] repeats ticks, sleeping a fixed frame period after
//! every rendered frame, and releases every boundary once stopped.
//!
//! # Example
//!
//! ```rust
//! use rigfuse_hal::{HeadlessSink, SimLidar, SimRadar};
//! use rigfuse_runtime::{FusionLoop, FusionLoopConfig};
//! use std::time::Duration;
//!
//! let config = FusionLoopConfig {
//!     frame_period: Duration::ZERO,
//!     ..FusionLoopConfig::default()
//! };
//! let mut fusion = FusionLoop::new(
//!     config,
//!     Box::new(SimLidar::new().with_azimuth_step(10.0).with_frame_limit(3)),
//!     Box::new(SimRadar::new()),
//!     Box::new(HeadlessSink::new()),
//! );
//! let rendered = fusion.run().expect("simulated rig always opens");
//! assert_eq!(rendered, 3);
//! ```

use std::fmt;
use std::time::Duration;

use rigfuse_hal::{LidarCapture, RadarSource, SceneSink};
use rigfuse_perception::{EulerAngles, LidarFrameBuilder, MountTransform};
use rigfuse_types::{CloudTag, RigError, Scene};
use tracing::{info, instrument, warn};

use crate::radar_aligner::{Alignment, RadarAligner};
use crate::stall_guard::StallGuard;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Sensor rotation period of a 16-channel spinning LIDAR at ~23 Hz.
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(43);

/// Configuration bundle for [`FusionLoop`].
#[derive(Debug, Clone)]
pub struct FusionLoopConfig {
    /// Fixed sleep after each rendered frame.
    pub frame_period: Duration,
    /// Mounting correction applied to every LIDAR point.
    pub correction: EulerAngles,
    /// Radar → LIDAR mount transform.
    pub mount: MountTransform,
    /// Consecutive empty ticks before a stall warning (0 disables it).
    pub stall_warn_ticks: u64,
}

impl Default for FusionLoopConfig {
    fn default() -> Self {
        Self {
            frame_period: DEFAULT_FRAME_PERIOD,
            correction: EulerAngles::identity(),
            mount: MountTransform::identity(),
            stall_warn_ticks: 50,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// States and outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of a [`FusionLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionState {
    /// Built, not started.
    Idle,
    /// Fusing one frame per tick.
    Running,
    /// Terminal.
    Stopped,
}

impl FusionState {
    fn name(self) -> &'static str {
        match self {
            FusionState::Idle => "Idle",
            FusionState::Running => "Running",
            FusionState::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for FusionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Point counts of one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_id: u64,
    pub lidar_points: usize,
    /// LIDAR entries carrying the non-return sentinel.
    pub degenerate_points: usize,
    pub radar_points: usize,
    pub gated_points: usize,
}

/// Result of one [`FusionLoop::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A scene was assembled and handed to the display.
    Rendered(FrameStats),
    /// No LIDAR data this tick; nothing was presented.
    Skipped,
    /// The loop is stopped.
    Stopped,
}

// ─────────────────────────────────────────────────────────────────────────────
// FusionLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Drives capture → frame building → alignment → scene → display.
pub struct FusionLoop {
    capture: Box<dyn LidarCapture>,
    radar: Box<dyn RadarSource>,
    sink: Box<dyn SceneSink>,
    builder: LidarFrameBuilder,
    aligner: RadarAligner,
    frame_period: Duration,
    stall: StallGuard,
    state: FusionState,
    next_frame_id: u64,
    released: bool,
}

impl FusionLoop {
    /// Wire up the loop.  Nothing is opened or started until
    /// [`start`][Self::start].
    pub fn new(
        config: FusionLoopConfig,
        capture: Box<dyn LidarCapture>,
        radar: Box<dyn RadarSource>,
        sink: Box<dyn SceneSink>,
    ) -> Self {
        Self {
            capture,
            radar,
            sink,
            builder: LidarFrameBuilder::new(config.correction),
            aligner: RadarAligner::new(config.mount),
            frame_period: config.frame_period,
            stall: StallGuard::new(config.stall_warn_ticks),
            state: FusionState::Idle,
            next_frame_id: 0,
            released: false,
        }
    }

    pub fn state(&self) -> FusionState {
        self.state
    }

    /// Move from Idle to Running: verify the capture opened and start the
    /// radar ingestion worker.
    ///
    /// # Errors
    ///
    /// - [`RigError::InvalidState`] when not Idle.
    /// - [`RigError::CaptureUnavailable`] when the capture did not open.
    /// - Whatever the radar returns from [`RadarSource::start`].
    pub fn start(&mut self) -> Result<(), RigError> {
        if self.state != FusionState::Idle {
            return Err(RigError::InvalidState {
                expected: FusionState::Idle.name(),
                actual: self.state.name(),
            });
        }
        if !self.capture.is_open() {
            return Err(RigError::CaptureUnavailable {
                source_id: self.capture.source_id().to_string(),
                details: "capture source is not open".to_string(),
            });
        }
        self.radar.start()?;
        self.state = FusionState::Running;
        info!(
            capture = self.capture.source_id(),
            radar = self.radar.id(),
            "fusion loop running"
        );
        Ok(())
    }

    /// Execute one fusion cycle.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::InvalidState`] if called before [`start`][Self::start].
    #[instrument(name = "fusion_tick", skip(self), fields(frame = self.next_frame_id))]
    pub fn tick(&mut self) -> Result<TickOutcome, RigError> {
        match self.state {
            FusionState::Idle => {
                return Err(RigError::InvalidState {
                    expected: FusionState::Running.name(),
                    actual: FusionState::Idle.name(),
                });
            }
            FusionState::Stopped => return Ok(TickOutcome::Stopped),
            FusionState::Running => {}
        }

        // ── 1. Stop check ─────────────────────────────────────────────────────
        if self.sink.close_requested() {
            info!("display requested close");
            self.state = FusionState::Stopped;
            return Ok(TickOutcome::Stopped);
        }
        if !self.capture.is_running() {
            info!(capture = self.capture.source_id(), "capture exhausted");
            self.state = FusionState::Stopped;
            return Ok(TickOutcome::Stopped);
        }

        // ── 2. Radar snapshot ────────────────────────────────────────────────
        let snapshot = self.radar.snapshot();

        // ── 3. LIDAR rotation ────────────────────────────────────────────────
        let returns = self.capture.next_batch();
        if returns.is_empty() {
            if self.stall.record_empty() {
                warn!(
                    capture = self.capture.source_id(),
                    empty_ticks = self.stall.consecutive(),
                    "no lidar data; capture may have stalled"
                );
            }
            return Ok(TickOutcome::Skipped);
        }
        self.stall.record_frame();

        // ── 4. Fuse ──────────────────────────────────────────────────────────
        let lidar = self.builder.build(&returns);
        let Alignment {
            radar_aligned,
            gated,
        } = self.aligner.align(&snapshot, self.radar.as_ref(), &lidar);

        let frame_id = self.next_frame_id;
        self.next_frame_id += 1;
        let stats = FrameStats {
            frame_id,
            lidar_points: lidar.len(),
            degenerate_points: lidar.iter().filter(|p| !p.is_valid()).count(),
            radar_points: radar_aligned.len(),
            gated_points: gated.len(),
        };

        // ── 5. Present ───────────────────────────────────────────────────────
        let mut scene = Scene::new(frame_id);
        scene.push(CloudTag::Lidar, lidar);
        scene.push(CloudTag::RadarAligned, radar_aligned);
        scene.push(CloudTag::RadarGated, gated);

        if let Err(e) = self.sink.present(&scene) {
            warn!(frame_id, error = %e, "display rejected scene");
        }
        Ok(TickOutcome::Rendered(stats))
    }

    /// Start if needed, tick until stopped, then release everything.
    ///
    /// Returns the number of rendered frames.
    ///
    /// # Errors
    ///
    /// Propagates [`start`][Self::start] failures.  Boundaries are released
    /// before returning in either case.
    pub fn run(&mut self) -> Result<u64, RigError> {
        if self.state == FusionState::Idle {
            if let Err(e) = self.start() {
                self.shutdown();
                return Err(e);
            }
        }

        let mut rendered = 0;
        loop {
            match self.tick()? {
                TickOutcome::Rendered(_) => {
                    rendered += 1;
                    if !self.frame_period.is_zero() {
                        std::thread::sleep(self.frame_period);
                    }
                }
                TickOutcome::Skipped => {}
                TickOutcome::Stopped => break,
            }
        }

        self.shutdown();
        info!(rendered, "fusion loop stopped");
        Ok(rendered)
    }

    /// Release capture and radar, close the display, and enter Stopped.
    /// Only the first call does anything.
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.radar.close();
        self.capture.close();
        self.sink.close();
        self.released = true;
        self.state = FusionState::Stopped;
    }
}

impl Drop for FusionLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rigfuse_perception::DetectionEnvelope;
    use rigfuse_types::{LaserReturn, Point3D};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    #[derive(Default, Clone)]
    struct Closes {
        capture: Arc<AtomicUsize>,
        radar: Arc<AtomicUsize>,
        sink: Arc<AtomicUsize>,
    }

    struct ScriptedCapture {
        batches: VecDeque<Vec<LaserReturn>>,
        open: bool,
        closes: Arc<AtomicUsize>,
    }

    impl LidarCapture for ScriptedCapture {
        fn source_id(&self) -> &str {
            "scripted"
        }
        fn is_open(&self) -> bool {
            self.open
        }
        fn is_running(&self) -> bool {
            self.open && !self.batches.is_empty()
        }
        fn next_batch(&mut self) -> Vec<LaserReturn> {
            self.batches.pop_front().unwrap_or_default()
        }
        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FixedRadar {
        points: Vec<Point3D>,
        envelope: DetectionEnvelope,
        started: bool,
        closes: Arc<AtomicUsize>,
    }

    impl RadarSource for FixedRadar {
        fn id(&self) -> &str {
            "fixed"
        }
        fn start(&mut self) -> Result<(), RigError> {
            self.started = true;
            Ok(())
        }
        fn snapshot(&self) -> Arc<[Point3D]> {
            Arc::from(self.points.clone())
        }
        fn envelope(&self) -> &DetectionEnvelope {
            &self.envelope
        }
        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct RecordingSink {
        scenes: Arc<Mutex<Vec<Scene>>>,
        close_requested: Arc<AtomicBool>,
        fail: bool,
        closes: Arc<AtomicUsize>,
    }

    impl SceneSink for RecordingSink {
        fn present(&mut self, scene: &Scene) -> Result<(), RigError> {
            self.scenes.lock().unwrap().push(scene.clone());
            if self.fail {
                return Err(RigError::Display {
                    details: "window gone".to_string(),
                });
            }
            Ok(())
        }
        fn close_requested(&self) -> bool {
            self.close_requested.load(Ordering::SeqCst)
        }
        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Rig {
        fusion: FusionLoop,
        scenes: Arc<Mutex<Vec<Scene>>>,
        close_flag: Arc<AtomicBool>,
        closes: Closes,
    }

    fn rig(batches: Vec<Vec<LaserReturn>>, radar_points: Vec<Point3D>) -> Rig {
        rig_with(batches, radar_points, true, false, Duration::ZERO)
    }

    fn rig_with(
        batches: Vec<Vec<LaserReturn>>,
        radar_points: Vec<Point3D>,
        open: bool,
        sink_fails: bool,
        frame_period: Duration,
    ) -> Rig {
        let closes = Closes::default();
        let scenes = Arc::new(Mutex::new(Vec::new()));
        let close_flag = Arc::new(AtomicBool::new(false));
        let config = FusionLoopConfig {
            frame_period,
            stall_warn_ticks: 2,
            ..FusionLoopConfig::default()
        };
        let fusion = FusionLoop::new(
            config,
            Box::new(ScriptedCapture {
                batches: batches.into(),
                open,
                closes: Arc::clone(&closes.capture),
            }),
            Box::new(FixedRadar {
                points: radar_points,
                envelope: DetectionEnvelope::default(),
                started: false,
                closes: Arc::clone(&closes.radar),
            }),
            Box::new(RecordingSink {
                scenes: Arc::clone(&scenes),
                close_requested: Arc::clone(&close_flag),
                fail: sink_fails,
                closes: Arc::clone(&closes.sink),
            }),
        );
        Rig {
            fusion,
            scenes,
            close_flag,
            closes,
        }
    }

    fn three_returns() -> Vec<LaserReturn> {
        vec![
            LaserReturn::new(10.0, 0.0, 0.0),  // (0, 10, 0): ahead, inside envelope
            LaserReturn::new(0.0, 45.0, 0.0),  // non-return
            LaserReturn::new(5.0, 90.0, 0.0),  // (5, 0, 0): 90° off boresight
        ]
    }

    fn two_radar_points() -> Vec<Point3D> {
        vec![Point3D::new(1.0, 2.0, 3.0), Point3D::new(4.0, 5.0, 6.0)]
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    #[test]
    fn new_loop_is_idle() {
        let r = rig(vec![], vec![]);
        assert_eq!(r.fusion.state(), FusionState::Idle);
    }

    #[test]
    fn tick_before_start_is_invalid() {
        let mut r = rig(vec![three_returns()], vec![]);
        assert!(matches!(r.fusion.tick(), Err(RigError::InvalidState { .. })));
    }

    #[test]
    fn start_fails_when_capture_not_open() {
        let mut r = rig_with(vec![three_returns()], vec![], false, false, Duration::ZERO);
        let err = r.fusion.start().unwrap_err();
        assert!(matches!(err, RigError::CaptureUnavailable { ref source_id, .. } if source_id == "scripted"));
        assert_eq!(r.fusion.state(), FusionState::Idle);
    }

    #[test]
    fn start_twice_is_invalid() {
        let mut r = rig(vec![three_returns()], vec![]);
        r.fusion.start().unwrap();
        assert_eq!(r.fusion.state(), FusionState::Running);
        assert!(matches!(r.fusion.start(), Err(RigError::InvalidState { .. })));
    }

    #[test]
    fn run_releases_boundaries_when_start_fails() {
        let mut r = rig_with(vec![], vec![], false, false, Duration::ZERO);
        assert!(r.fusion.run().is_err());
        assert_eq!(r.closes.capture.load(Ordering::SeqCst), 1);
        assert_eq!(r.closes.radar.load(Ordering::SeqCst), 1);
        assert_eq!(r.closes.sink.load(Ordering::SeqCst), 1);
    }

    // ------------------------------------------------------------------
    // Per-frame behaviour
    // ------------------------------------------------------------------

    #[test]
    fn one_iteration_yields_three_tagged_clouds() {
        let mut r = rig(vec![three_returns()], two_radar_points());
        r.fusion.start().unwrap();

        let outcome = r.fusion.tick().unwrap();
        let TickOutcome::Rendered(stats) = outcome else {
            panic!("expected a rendered frame, got {outcome:?}");
        };
        assert_eq!(stats.lidar_points, 3);
        assert_eq!(stats.degenerate_points, 1);
        assert_eq!(stats.radar_points, 2);
        assert_eq!(stats.gated_points, 1);

        let scenes = r.scenes.lock().unwrap();
        assert_eq!(scenes.len(), 1);
        let scene = &scenes[0];
        assert_eq!(scene.clouds.len(), 3);
        let tags: Vec<CloudTag> = scene.clouds.iter().map(|c| c.tag).collect();
        assert_eq!(tags, vec![CloudTag::Lidar, CloudTag::RadarAligned, CloudTag::RadarGated]);

        let lidar = &scene.cloud(CloudTag::Lidar).unwrap().points;
        let gated = &scene.cloud(CloudTag::RadarGated).unwrap().points;
        assert_eq!(lidar.len(), 3);
        assert_eq!(scene.cloud(CloudTag::RadarAligned).unwrap().points.len(), 2);
        assert!(gated.len() <= 3);
        for p in gated {
            assert!(lidar.contains(p));
        }
    }

    #[test]
    fn empty_batch_skips_without_presenting() {
        let mut r = rig(vec![vec![], three_returns()], two_radar_points());
        r.fusion.start().unwrap();

        assert_eq!(r.fusion.tick().unwrap(), TickOutcome::Skipped);
        assert_eq!(r.fusion.state(), FusionState::Running);
        assert!(r.scenes.lock().unwrap().is_empty());

        assert!(matches!(r.fusion.tick().unwrap(), TickOutcome::Rendered(_)));
        assert_eq!(r.scenes.lock().unwrap().len(), 1);
    }

    #[test]
    fn repeated_empty_batches_keep_running() {
        let mut r = rig(vec![vec![], vec![], vec![], three_returns()], vec![]);
        r.fusion.start().unwrap();
        for _ in 0..3 {
            assert_eq!(r.fusion.tick().unwrap(), TickOutcome::Skipped);
        }
        assert!(matches!(r.fusion.tick().unwrap(), TickOutcome::Rendered(_)));
    }

    #[test]
    fn empty_radar_still_renders() {
        let mut r = rig(vec![three_returns()], vec![]);
        r.fusion.start().unwrap();
        let TickOutcome::Rendered(stats) = r.fusion.tick().unwrap() else {
            panic!("expected a rendered frame");
        };
        assert_eq!(stats.radar_points, 0);
        assert_eq!(stats.gated_points, 1);
    }

    #[test]
    fn each_frame_gets_a_fresh_scene() {
        let mut r = rig(vec![three_returns(), three_returns()], two_radar_points());
        r.fusion.start().unwrap();
        r.fusion.tick().unwrap();
        r.fusion.tick().unwrap();

        let scenes = r.scenes.lock().unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].frame_id, 0);
        assert_eq!(scenes[1].frame_id, 1);
        assert_eq!(scenes[1].cloud(CloudTag::Lidar).unwrap().points.len(), 3);
    }

    #[test]
    fn display_errors_do_not_stop_the_loop() {
        let mut r = rig_with(vec![three_returns(), three_returns()], vec![], true, true, Duration::ZERO);
        r.fusion.start().unwrap();
        assert!(matches!(r.fusion.tick().unwrap(), TickOutcome::Rendered(_)));
        assert!(matches!(r.fusion.tick().unwrap(), TickOutcome::Rendered(_)));
        assert_eq!(r.fusion.state(), FusionState::Running);
    }

    // ------------------------------------------------------------------
    // Termination
    // ------------------------------------------------------------------

    #[test]
    fn close_request_stops_the_loop() {
        let mut r = rig(vec![three_returns(), three_returns()], vec![]);
        r.fusion.start().unwrap();
        r.fusion.tick().unwrap();

        r.close_flag.store(true, Ordering::SeqCst);
        assert_eq!(r.fusion.tick().unwrap(), TickOutcome::Stopped);
        assert_eq!(r.fusion.state(), FusionState::Stopped);
        assert_eq!(r.fusion.tick().unwrap(), TickOutcome::Stopped);
        assert_eq!(r.scenes.lock().unwrap().len(), 1);
    }

    #[test]
    fn run_stops_on_capture_exhaustion_and_releases_once() {
        let mut r = rig(vec![three_returns(), vec![], three_returns()], two_radar_points());
        let rendered = r.fusion.run().unwrap();

        assert_eq!(rendered, 2);
        assert_eq!(r.fusion.state(), FusionState::Stopped);
        r.fusion.shutdown();
        assert_eq!(r.closes.capture.load(Ordering::SeqCst), 1);
        assert_eq!(r.closes.radar.load(Ordering::SeqCst), 1);
        assert_eq!(r.closes.sink.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_stops_on_close_request() {
        let mut r = rig(vec![three_returns(); 5], vec![]);
        r.close_flag.store(true, Ordering::SeqCst);
        assert_eq!(r.fusion.run().unwrap(), 0);
        assert!(r.scenes.lock().unwrap().is_empty());
    }

    #[test]
    fn run_sleeps_after_rendered_frames_only() {
        let period = Duration::from_millis(40);
        let mut batches = vec![three_returns(); 3];
        batches.extend(std::iter::repeat_n(Vec::new(), 5));
        let mut r = rig_with(batches, vec![], true, false, period);

        let started = std::time::Instant::now();
        assert_eq!(r.fusion.run().unwrap(), 3);
        let elapsed = started.elapsed();

        assert!(elapsed >= period * 3, "rendered frames were not paced: {elapsed:?}");
        // Five more sleeps would push this past 320 ms.
        assert!(elapsed < Duration::from_millis(300), "empty rotations slept: {elapsed:?}");
        assert_eq!(r.scenes.lock().unwrap().len(), 3);
    }
}
