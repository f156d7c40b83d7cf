//! Radar detection envelope and range gating.
//!
//! The envelope is a range/angle volume in the radar's own frame with the
//! boresight along +y (the same convention as LIDAR azimuth 0):
//!
//! ```text
//! range     = |p|
//! azimuth   = atan2(x, y)
//! elevation = atan2(z, hypot(x, y))
//! ```
//!
//! A point is inside when its range lies in `[min_range, max_range]` and both
//! angles lie within the half field-of-view limits.  Non-return points are
//! never inside.

use rigfuse_types::{FrameBuffer, Point3D};

use crate::mount::MountTransform;

/// The volume a radar reports valid detections in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionEnvelope {
    pub min_range: f32,
    pub max_range: f32,
    /// Half of the horizontal field of view (radians).
    pub azimuth_half_fov: f32,
    /// Half of the vertical field of view (radians).
    pub elevation_half_fov: f32,
}

impl DetectionEnvelope {
    /// Build an envelope from full fields of view given in degrees.
    pub fn from_degrees(min_range: f32, max_range: f32, azimuth_fov: f32, elevation_fov: f32) -> Self {
        Self {
            min_range,
            max_range,
            azimuth_half_fov: (azimuth_fov * 0.5).to_radians(),
            elevation_half_fov: (elevation_fov * 0.5).to_radians(),
        }
    }

    /// True when radar-local point `p` is inside the envelope.
    pub fn contains(&self, p: Point3D) -> bool {
        if !p.is_valid() {
            return false;
        }
        let range = p.norm();
        if range < self.min_range || range > self.max_range {
            return false;
        }
        let azimuth = p.x.atan2(p.y);
        let elevation = p.z.atan2(p.x.hypot(p.y));
        azimuth.abs() <= self.azimuth_half_fov && elevation.abs() <= self.elevation_half_fov
    }

    /// Select the LIDAR-frame points whose radar-local position is inside the
    /// envelope.  Returned points are copies of the inputs, in input order.
    pub fn gate(&self, lidar_points: &[Point3D], mount: &MountTransform) -> FrameBuffer {
        lidar_points
            .iter()
            .copied()
            .filter(|&p| self.contains(mount.to_radar(p)))
            .collect()
    }
}

impl Default for DetectionEnvelope {
    fn default() -> Self {
        Self::from_degrees(0.0, 2000.0, 120.0, 30.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigfuse_types::{MountAxes, MountOffset};

    #[test]
    fn boresight_point_is_inside() {
        let env = DetectionEnvelope::default();
        assert!(env.contains(Point3D::new(0.0, 100.0, 0.0)));
    }

    #[test]
    fn behind_the_radar_is_outside() {
        let env = DetectionEnvelope::default();
        assert!(!env.contains(Point3D::new(0.0, -100.0, 0.0)));
    }

    #[test]
    fn range_limits_apply() {
        let env = DetectionEnvelope::from_degrees(10.0, 50.0, 120.0, 30.0);
        assert!(!env.contains(Point3D::new(0.0, 5.0, 0.0)));
        assert!(env.contains(Point3D::new(0.0, 30.0, 0.0)));
        assert!(!env.contains(Point3D::new(0.0, 60.0, 0.0)));
    }

    #[test]
    fn angle_limits_apply() {
        let env = DetectionEnvelope::from_degrees(0.0, 1000.0, 90.0, 20.0);
        // 40° off boresight horizontally: inside ±45°
        let az40 = 40.0_f32.to_radians();
        assert!(env.contains(Point3D::new(100.0 * az40.sin(), 100.0 * az40.cos(), 0.0)));
        // 50°: outside
        let az50 = 50.0_f32.to_radians();
        assert!(!env.contains(Point3D::new(100.0 * az50.sin(), 100.0 * az50.cos(), 0.0)));
        // 15° up: outside ±10°
        let el15 = 15.0_f32.to_radians();
        assert!(!env.contains(Point3D::new(0.0, 100.0 * el15.cos(), 100.0 * el15.sin())));
    }

    #[test]
    fn non_returns_never_pass() {
        assert!(!DetectionEnvelope::default().contains(Point3D::NON_RETURN));
    }

    #[test]
    fn gate_is_a_subset_of_the_input() {
        let env = DetectionEnvelope::from_degrees(0.0, 100.0, 90.0, 30.0);
        let mount = MountTransform::new(MountOffset::new(0.0, 0.0, 10.0), MountAxes::default());
        let lidar = vec![
            Point3D::new(0.0, 50.0, 0.0),
            Point3D::NON_RETURN,
            Point3D::new(0.0, -50.0, 0.0),
            Point3D::new(500.0, 0.0, 0.0),
            Point3D::new(5.0, 20.0, 1.0),
        ];
        let gated = env.gate(&lidar, &mount);

        assert_eq!(gated, vec![Point3D::new(0.0, 50.0, 0.0), Point3D::new(5.0, 20.0, 1.0)]);
        for p in &gated {
            assert!(lidar.contains(p));
        }
    }

    #[test]
    fn gate_accounts_for_mount_offset() {
        let env = DetectionEnvelope::from_degrees(0.0, 1000.0, 60.0, 60.0);
        // Radar sits 100 units back of the LIDAR; a point at the LIDAR origin
        // line 50 ahead is 150 ahead of the radar.
        let mount = MountTransform::new(MountOffset::new(0.0, 0.0, 100.0), MountAxes::default());
        assert_eq!(env.gate(&[Point3D::new(0.0, 50.0, 0.0)], &mount).len(), 1);
        // A point between the sensors but 0.5 units ahead of the radar and far
        // to the side is outside the 60° cone.
        assert!(env.gate(&[Point3D::new(40.0, -99.5, 0.0)], &mount).is_empty());
    }
}
