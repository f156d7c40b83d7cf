//! Builds the capture, radar and display boundaries named in the config.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use rigfuse_cockpit::CockpitViewer;
use rigfuse_hal::{
    HeadlessSink, LidarCapture, RadarSource, ReplayCapture, SceneSink, SimLidar, SimRadar,
    TcpRadar, UdpCapture,
};
use rigfuse_runtime::FusionLoop;
use rigfuse_types::RigError;
use tokio::runtime::Handle;
use tracing::info;

use crate::config::{CaptureKind, Config, RadarKind, ViewerKind};

/// The assembled loop plus the flag that asks it to stop.
pub struct Rig {
    pub fusion: FusionLoop,
    pub close_flag: Arc<AtomicBool>,
}

/// Open every boundary and wire them into a [`FusionLoop`].
///
/// # Errors
///
/// - [`RigError::CaptureUnavailable`] if the LIDAR source cannot be opened.
/// - [`RigError::Config`] if the config names a replay without a path.
/// - [`RigError::Display`] if the viewer port cannot be bound.
pub fn assemble(cfg: &Config, runtime: &Handle) -> Result<Rig, RigError> {
    let capture = build_capture(cfg)?;
    let radar = build_radar(cfg, runtime);
    let (sink, close_flag) = build_sink(cfg, runtime)?;

    info!(
        capture = capture.source_id(),
        radar = radar.id(),
        viewer = ?cfg.viewer.kind,
        "rig assembled"
    );
    let fusion = FusionLoop::new(cfg.fusion_loop_config(), capture, radar, sink);
    Ok(Rig { fusion, close_flag })
}

fn build_capture(cfg: &Config) -> Result<Box<dyn LidarCapture>, RigError> {
    let c = &cfg.capture;
    Ok(match c.kind {
        CaptureKind::Simulated => {
            let mut lidar = SimLidar::new().with_azimuth_step(c.azimuth_step_deg);
            if let Some(limit) = c.frame_limit {
                lidar = lidar.with_frame_limit(limit);
            }
            Box::new(lidar)
        }
        CaptureKind::Replay => {
            let path = c.path.as_ref().ok_or_else(|| {
                RigError::Config("capture.kind = \"replay\" needs capture.path".to_string())
            })?;
            Box::new(ReplayCapture::open(path)?)
        }
        CaptureKind::Udp => Box::new(UdpCapture::bind(
            c.address,
            c.port,
            Duration::from_millis(c.timeout_ms),
        )?),
    })
}

fn build_radar(cfg: &Config, runtime: &Handle) -> Box<dyn RadarSource> {
    let envelope = cfg.radar.envelope.to_envelope();
    match cfg.radar.kind {
        RadarKind::Simulated => Box::new(SimRadar::new().with_envelope(envelope)),
        RadarKind::Tcp => Box::new(TcpRadar::new(
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), cfg.radar.port),
            envelope,
            runtime.clone(),
        )),
    }
}

fn build_sink(
    cfg: &Config,
    runtime: &Handle,
) -> Result<(Box<dyn SceneSink>, Arc<AtomicBool>), RigError> {
    match cfg.viewer.kind {
        ViewerKind::Cockpit => {
            let viewer = CockpitViewer::launch(cfg.viewer.port, runtime.clone())?;
            let flag = viewer.close_flag();
            Ok((Box::new(viewer), flag))
        }
        ViewerKind::Headless => {
            let mut sink = HeadlessSink::new();
            if let Some(max) = cfg.viewer.max_frames {
                sink = sink.with_max_frames(max);
            }
            let flag = sink.close_flag();
            Ok((Box::new(sink), flag))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigfuse_runtime::FusionState;
    use std::sync::atomic::Ordering;

    fn headless_sim_config(frames: u64) -> Config {
        let mut cfg = Config::default();
        cfg.frame_period_ms = 0;
        cfg.capture.azimuth_step_deg = 10.0;
        cfg.capture.frame_limit = Some(frames);
        cfg.viewer.kind = ViewerKind::Headless;
        cfg
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Runtime::new().expect("tokio runtime")
    }

    #[test]
    fn simulated_rig_runs_to_capture_exhaustion() {
        let rt = runtime();
        let mut rig = assemble(&headless_sim_config(3), rt.handle()).expect("assemble");
        assert_eq!(rig.fusion.run().expect("run"), 3);
        assert_eq!(rig.fusion.state(), FusionState::Stopped);
    }

    #[test]
    fn close_flag_stops_the_rig() {
        let rt = runtime();
        let mut rig = assemble(&headless_sim_config(1000), rt.handle()).expect("assemble");
        rig.close_flag.store(true, Ordering::SeqCst);
        assert_eq!(rig.fusion.run().expect("run"), 0);
    }

    #[test]
    fn headless_max_frames_bounds_the_run() {
        let rt = runtime();
        let mut cfg = headless_sim_config(1000);
        cfg.viewer.max_frames = Some(2);
        let mut rig = assemble(&cfg, rt.handle()).expect("assemble");
        assert_eq!(rig.fusion.run().expect("run"), 2);
    }

    #[test]
    fn missing_recording_is_capture_unavailable() {
        let rt = runtime();
        let dir = tempfile::tempdir().expect("tmp dir");
        let mut cfg = headless_sim_config(1);
        cfg.capture.kind = CaptureKind::Replay;
        cfg.capture.path = Some(dir.path().join("missing.jsonl"));
        assert!(matches!(
            assemble(&cfg, rt.handle()),
            Err(RigError::CaptureUnavailable { .. })
        ));
    }

    #[test]
    fn replay_without_path_is_a_config_error() {
        let rt = runtime();
        let mut cfg = headless_sim_config(1);
        cfg.capture.kind = CaptureKind::Replay;
        assert!(matches!(assemble(&cfg, rt.handle()), Err(RigError::Config(_))));
    }

    #[test]
    fn replay_rig_renders_each_non_empty_rotation() {
        use rigfuse_types::LaserReturn;
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().expect("tmp file");
        let rotation = vec![
            LaserReturn::new(10.0, 0.0, 0.0),
            LaserReturn::new(0.0, 45.0, 0.0),
        ];
        ReplayCapture::write_rotation(&mut file, &rotation).expect("write");
        file.write_all(b"\n").expect("blank");
        ReplayCapture::write_rotation(&mut file, &rotation).expect("write");
        file.flush().expect("flush");

        let rt = runtime();
        let mut cfg = headless_sim_config(1);
        cfg.capture.kind = CaptureKind::Replay;
        cfg.capture.path = Some(file.path().to_path_buf());
        let mut rig = assemble(&cfg, rt.handle()).expect("assemble");
        assert_eq!(rig.fusion.run().expect("run"), 2);
    }
}
