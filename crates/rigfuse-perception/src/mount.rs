//! Rigid radar → LIDAR alignment by a fixed mechanical offset.

use rigfuse_types::{FrameBuffer, MountAxes, MountOffset, Point3D};

/// Translation that re-expresses radar-local points in the LIDAR frame.
///
/// `up`, `right` and `back` are projected onto the LIDAR axes named by
/// [`MountAxes`]; the resulting vector is the radar origin seen from the
/// LIDAR.  No rotation is involved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountTransform {
    translation: Point3D,
}

impl MountTransform {
    pub fn new(offset: MountOffset, axes: MountAxes) -> Self {
        let translation = axes
            .up
            .scaled(offset.up)
            .add(axes.right.scaled(offset.right))
            .add(axes.back.scaled(offset.back));
        Self { translation }
    }

    /// Zero offset.
    pub fn identity() -> Self {
        Self::new(MountOffset::default(), MountAxes::default())
    }

    /// The radar origin expressed in the LIDAR frame.
    pub fn translation(&self) -> Point3D {
        self.translation
    }

    /// Radar-local → LIDAR frame.
    pub fn to_lidar(&self, p: Point3D) -> Point3D {
        p.add(self.translation)
    }

    /// LIDAR frame → radar-local.
    pub fn to_radar(&self, p: Point3D) -> Point3D {
        p.sub(self.translation)
    }

    /// Translate a whole radar buffer, preserving order and length.
    pub fn align(&self, radar_points: &[Point3D]) -> FrameBuffer {
        radar_points.iter().map(|&p| self.to_lidar(p)).collect()
    }
}

impl Default for MountTransform {
    fn default() -> Self {
        Self::identity()
    }
}
