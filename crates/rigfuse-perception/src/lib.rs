//! `rigfuse-perception` – coordinate-system normalisation and alignment.
//!
//! Pure, allocation-per-frame math that turns raw sensor samples into points
//! in a common frame.  Nothing in this crate talks to hardware.
//!
//! # Modules
//!
//! - [`angles`] – yaw / pitch / roll rotations and the composed
//!   [`rotate_euler`][angles::rotate_euler] used for mounting correction.
//! - [`lidar_frame`] – [`LidarFrameBuilder`][lidar_frame::LidarFrameBuilder]:
//!   spherical-to-Cartesian conversion with non-return substitution.
//! - [`mount`] – [`MountTransform`][mount::MountTransform]: the fixed
//!   translation between the radar and LIDAR origins.
//! - [`envelope`] – [`DetectionEnvelope`][envelope::DetectionEnvelope]: the
//!   radar's range/angle validity predicate used for gating.

pub mod angles;
pub mod envelope;
pub mod lidar_frame;
pub mod mount;

pub use angles::EulerAngles;
pub use envelope::DetectionEnvelope;
pub use lidar_frame::LidarFrameBuilder;
pub use mount::MountTransform;
