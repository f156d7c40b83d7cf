//! LIDAR frame builder.
//!
//! Converts one rotation's worth of [`LaserReturn`]s into Cartesian points in
//! the LIDAR's local frame:
//!
//! ```text
//! x = distance · cos(vertical) · sin(azimuth)
//! y = distance · cos(vertical) · cos(azimuth)
//! z = distance · sin(vertical)
//! ```
//!
//! A return that lands exactly on the origin is a non-return and becomes
//! [`Point3D::NON_RETURN`].  The mounting correction is applied afterwards.
//! Output length always equals input length.
//!
//! # Example
//!
//! ```rust
//! use rigfuse_perception::LidarFrameBuilder;
//! use rigfuse_types::LaserReturn;
//!
//! let builder = LidarFrameBuilder::default();
//! let frame = builder.build(&[LaserReturn::new(10.0, 0.0, 0.0)]);
//! assert_eq!(frame.len(), 1);
//! assert!((frame[0].y - 10.0).abs() < 1e-5);
//! ```

use rigfuse_types::{FrameBuffer, LaserReturn, Point3D};
use tracing::{debug, instrument};

use crate::angles::EulerAngles;

/// Convert a single polar return to a LIDAR-local point, substituting the
/// non-return sentinel for the origin.
pub fn spherical_to_cartesian(ret: &LaserReturn) -> Point3D {
    let azimuth = ret.azimuth.to_radians();
    let vertical = ret.vertical.to_radians();
    let horizontal = ret.distance * vertical.cos();

    let x = (horizontal * azimuth.sin()) as f32;
    let y = (horizontal * azimuth.cos()) as f32;
    let z = (ret.distance * vertical.sin()) as f32;

    if x == 0.0 && y == 0.0 && z == 0.0 {
        Point3D::NON_RETURN
    } else {
        Point3D::new(x, y, z)
    }
}

/// Builds LIDAR-frame [`FrameBuffer`]s from raw return batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct LidarFrameBuilder {
    correction: EulerAngles,
}

impl LidarFrameBuilder {
    /// Create a builder that applies `correction` to every converted point.
    pub fn new(correction: EulerAngles) -> Self {
        Self { correction }
    }

    /// Convert `returns` in order.  An empty batch yields an empty buffer;
    /// the caller decides to skip the frame.
    #[instrument(name = "build_lidar_frame", skip_all, fields(returns = returns.len()))]
    pub fn build(&self, returns: &[LaserReturn]) -> FrameBuffer {
        let points: FrameBuffer = returns
            .iter()
            .map(|r| self.correction.apply(spherical_to_cartesian(r)))
            .collect();

        debug!(
            points = points.len(),
            non_returns = points.iter().filter(|p| !p.is_valid()).count(),
            "lidar frame built"
        );
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_return_lands_on_positive_y() {
        let p = spherical_to_cartesian(&LaserReturn::new(10.0, 0.0, 0.0));
        assert!(p.x.abs() < 1e-5, "x = {}", p.x);
        assert!((p.y - 10.0).abs() < 1e-5, "y = {}", p.y);
        assert!(p.z.abs() < 1e-5, "z = {}", p.z);
    }

    #[test]
    fn ninety_degrees_azimuth_lands_on_positive_x() {
        let p = spherical_to_cartesian(&LaserReturn::new(5.0, 90.0, 0.0));
        assert!((p.x - 5.0).abs() < 1e-5);
        assert!(p.y.abs() < 1e-5);
    }

    #[test]
    fn vertical_angle_lifts_point() {
        let p = spherical_to_cartesian(&LaserReturn::new(2.0, 0.0, 30.0));
        assert!((p.z - 1.0).abs() < 1e-5);
        assert!((p.y - 3.0_f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn zero_distance_is_always_a_non_return() {
        for (azimuth, vertical) in [(0.0, 0.0), (123.4, -15.0), (359.9, 15.0), (90.0, 1.0)] {
            let p = spherical_to_cartesian(&LaserReturn::new(0.0, azimuth, vertical));
            assert!(p.x.is_nan() && p.y.is_nan() && p.z.is_nan(), "{p:?}");
        }
    }

    #[test]
    fn build_preserves_length_and_order() {
        let builder = LidarFrameBuilder::default();
        let returns = [
            LaserReturn::new(1.0, 0.0, 0.0),
            LaserReturn::new(0.0, 45.0, 3.0),
            LaserReturn::new(2.0, 90.0, 0.0),
        ];
        let frame = builder.build(&returns);

        assert_eq!(frame.len(), returns.len());
        assert!((frame[0].y - 1.0).abs() < 1e-5);
        assert!(!frame[1].is_valid());
        assert!((frame[2].x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn empty_batch_yields_empty_frame() {
        assert!(LidarFrameBuilder::default().build(&[]).is_empty());
    }

    #[test]
    fn correction_is_applied_after_conversion() {
        let builder = LidarFrameBuilder::new(EulerAngles::from_degrees(-90.0, 0.0, 0.0));
        // (0, 10, 0) yawed by -90° → (10, 0, 0)
        let frame = builder.build(&[LaserReturn::new(10.0, 0.0, 0.0)]);
        assert!((frame[0].x - 10.0).abs() < 1e-4, "{:?}", frame[0]);
        assert!(frame[0].y.abs() < 1e-4);
    }

    #[test]
    fn correction_keeps_non_returns_invalid() {
        let builder = LidarFrameBuilder::new(EulerAngles::from_degrees(10.0, 20.0, 30.0));
        let frame = builder.build(&[LaserReturn::new(0.0, 10.0, 0.0)]);
        assert!(!frame[0].is_valid());
    }
}
