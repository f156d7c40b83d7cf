//! `rigfuse-hal` – sensor and display boundaries.
//!
//! The fusion loop never talks to a device directly.  It sees three traits:
//!
//! - [`LidarCapture`][capture::LidarCapture] – pull API over a rotating LIDAR
//!   that yields one batch of [`LaserReturn`][rigfuse_types::LaserReturn]s
//!   per rotation.
//! - [`RadarSource`][radar::RadarSource] – an asynchronously refreshed radar
//!   point buffer read as a snapshot, plus the radar's gating envelope.
//! - [`SceneSink`][display::SceneSink] – accepts one
//!   [`Scene`][rigfuse_types::Scene] per frame and reports close requests.
//!
//! # Drivers
//!
//! | Driver | Trait | Source |
//! |---|---|---|
//! | [`SimLidar`][sim::SimLidar] | `LidarCapture` | ray-cast synthetic room |
//! | [`ReplayCapture`][replay::ReplayCapture] | `LidarCapture` | recorded JSON-lines capture file |
//! | [`UdpCapture`][udp::UdpCapture] | `LidarCapture` | decoded batches over UDP |
//! | [`SimRadar`][sim::SimRadar] | `RadarSource` | fixed / orbiting targets |
//! | [`TcpRadar`][tcp_radar::TcpRadar] | `RadarSource` | line-delimited JSON over TCP |
//! | [`HeadlessSink`][sim::HeadlessSink] | `SceneSink` | logs scene statistics |

pub mod capture;
pub mod display;
pub mod mailbox;
pub mod radar;
pub mod replay;
pub mod sim;
pub mod tcp_radar;
pub mod udp;

pub use capture::LidarCapture;
pub use display::SceneSink;
pub use mailbox::{SnapshotReader, SnapshotWriter, snapshot_mailbox};
pub use radar::RadarSource;
pub use replay::ReplayCapture;
pub use sim::{HeadlessSink, SimLidar, SimRadar};
pub use tcp_radar::{DEFAULT_RADAR_PORT, TcpRadar};
pub use udp::UdpCapture;
