//! Elemental rotations and the composed Euler transform.
//!
//! Each rotation is a right-handed 2-D rotation inside one coordinate plane:
//!
//! | Rotation | Plane | Axis left untouched |
//! |---|---|---|
//! | [`yaw`]   | x–y | z |
//! | [`pitch`] | x–z | y |
//! | [`roll`]  | y–z | x |
//!
//! [`rotate_euler`] applies yaw, then pitch, then roll.  The order is part of
//! the contract: the rotations do not commute.
//!
//! # Example
//!
//! ```rust
//! use std::f32::consts::FRAC_PI_2;
//! use rigfuse_perception::angles::yaw;
//! use rigfuse_types::Point3D;
//!
//! let p = yaw(Point3D::new(1.0, 0.0, 0.0), FRAC_PI_2);
//! assert!(p.x.abs() < 1e-6);
//! assert!((p.y - 1.0).abs() < 1e-6);
//! ```

use rigfuse_types::Point3D;

/// Rotate `p` by `a` radians in the x–y plane.
pub fn yaw(p: Point3D, a: f32) -> Point3D {
    let (s, c) = a.sin_cos();
    Point3D::new(c * p.x - s * p.y, s * p.x + c * p.y, p.z)
}

/// Rotate `p` by `b` radians in the x–z plane.
pub fn pitch(p: Point3D, b: f32) -> Point3D {
    let (s, c) = b.sin_cos();
    Point3D::new(c * p.x + s * p.z, p.y, -s * p.x + c * p.z)
}

/// Rotate `p` by `c` radians in the y–z plane.
pub fn roll(p: Point3D, c: f32) -> Point3D {
    let (s, co) = c.sin_cos();
    Point3D::new(p.x, co * p.y - s * p.z, s * p.y + co * p.z)
}

/// Yaw by `a`, then pitch by `b`, then roll by `c` (radians).
pub fn rotate_euler(p: Point3D, a: f32, b: f32, c: f32) -> Point3D {
    roll(pitch(yaw(p, a), b), c)
}

/// A fixed mounting correction expressed as three Euler angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl EulerAngles {
    pub fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll }
    }

    /// No rotation.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Build from angles given in degrees.
    pub fn from_degrees(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self::new(yaw.to_radians(), pitch.to_radians(), roll.to_radians())
    }

    pub fn is_identity(&self) -> bool {
        self.yaw == 0.0 && self.pitch == 0.0 && self.roll == 0.0
    }

    /// Apply the composed yaw → pitch → roll rotation to `p`.
    pub fn apply(&self, p: Point3D) -> Point3D {
        rotate_euler(p, self.yaw, self.pitch, self.roll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, TAU};

    fn assert_close(a: Point3D, b: Point3D) {
        assert!(
            (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4 && (a.z - b.z).abs() < 1e-4,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn yaw_keeps_z() {
        let p = Point3D::new(1.5, -2.0, 4.25);
        for theta in [0.1_f32, 1.0, 2.5, -3.0] {
            assert_eq!(yaw(p, theta).z, p.z);
        }
    }

    #[test]
    fn pitch_keeps_y_and_roll_keeps_x() {
        let p = Point3D::new(1.5, -2.0, 4.25);
        assert_eq!(pitch(p, 0.7).y, p.y);
        assert_eq!(roll(p, 0.7).x, p.x);
    }

    #[test]
    fn full_turn_is_identity_on_every_axis() {
        let p = Point3D::new(3.0, -1.0, 2.0);
        assert_close(yaw(p, TAU), p);
        assert_close(pitch(p, TAU), p);
        assert_close(roll(p, TAU), p);
    }

    #[test]
    fn quarter_turns_follow_right_hand_convention() {
        // yaw: +x → +y
        assert_close(yaw(Point3D::new(1.0, 0.0, 0.0), FRAC_PI_2), Point3D::new(0.0, 1.0, 0.0));
        // pitch: +x → -z
        assert_close(pitch(Point3D::new(1.0, 0.0, 0.0), FRAC_PI_2), Point3D::new(0.0, 0.0, -1.0));
        // roll: +y → +z
        assert_close(roll(Point3D::new(0.0, 1.0, 0.0), FRAC_PI_2), Point3D::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn composition_order_matters() {
        let p = Point3D::new(1.0, 2.0, 3.0);
        let (a, b, c) = (0.3, 0.5, 0.7);
        let forward = rotate_euler(p, a, b, c);
        let reversed = yaw(pitch(roll(p, c), b), a);
        let diff = forward.sub(reversed).norm();
        assert!(diff > 1e-3, "expected different results, diff = {diff}");
    }

    #[test]
    fn rotation_preserves_length() {
        let p = Point3D::new(1.0, 2.0, 3.0);
        let r = rotate_euler(p, 0.3, -1.1, 2.0);
        assert!((r.norm() - p.norm()).abs() < 1e-4);
    }

    #[test]
    fn identity_angles_leave_point_untouched() {
        let p = Point3D::new(-4.0, 0.5, 9.0);
        let angles = EulerAngles::identity();
        assert!(angles.is_identity());
        assert_eq!(angles.apply(p), p);
    }

    #[test]
    fn from_degrees_converts() {
        let angles = EulerAngles::from_degrees(90.0, 0.0, 180.0);
        assert!((angles.yaw - FRAC_PI_2).abs() < 1e-6);
        assert!((angles.roll - std::f32::consts::PI).abs() < 1e-6);
        assert!(!angles.is_identity());
    }

    #[test]
    fn nan_stays_nan() {
        let r = EulerAngles::new(0.2, 0.3, 0.4).apply(Point3D::NON_RETURN);
        assert!(!r.is_valid());
    }
}
