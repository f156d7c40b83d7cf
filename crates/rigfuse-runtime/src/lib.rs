//! `rigfuse-runtime` – the per-frame fusion driver.
//!
//! # Modules
//!
//! - [`fusion_loop`] – [`FusionLoop`][fusion_loop::FusionLoop]: the
//!   Idle → Running → Stopped state machine that pulls a radar snapshot and a
//!   LIDAR rotation each tick, fuses them, and hands a three-cloud
//!   [`Scene`][rigfuse_types::Scene] to the display.
//! - [`radar_aligner`] – [`RadarAligner`][radar_aligner::RadarAligner]:
//!   re-expresses the radar snapshot in the LIDAR frame and gates LIDAR
//!   points through the radar's detection envelope.
//! - [`stall_guard`] – [`StallGuard`][stall_guard::StallGuard]: notices runs
//!   of empty capture ticks.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.

pub mod fusion_loop;
pub mod radar_aligner;
pub mod stall_guard;
pub mod telemetry;

pub use fusion_loop::{FrameStats, FusionLoop, FusionLoopConfig, FusionState, TickOutcome};
pub use radar_aligner::{Alignment, RadarAligner};
pub use stall_guard::StallGuard;
pub use telemetry::{TracerProviderGuard, init_tracing};
