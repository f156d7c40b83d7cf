//! [`RadarAligner`] – boundary logic between the radar subsystem and the
//! LIDAR frame.
//!
//! Given the radar's current snapshot and the frame's LIDAR buffer it
//! produces:
//!
//! 1. the radar points translated by the rig's fixed mount offset, and
//! 2. the LIDAR points that lie inside the radar's detection envelope.
//!
//! An empty snapshot is normal and yields an empty radar cloud.

use rigfuse_hal::RadarSource;
use rigfuse_perception::MountTransform;
use rigfuse_types::{FrameBuffer, Point3D};
use tracing::{debug, instrument};

/// Output of one alignment pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Alignment {
    /// Radar snapshot re-expressed in the LIDAR frame.
    pub radar_aligned: FrameBuffer,
    /// LIDAR points within the radar's envelope.
    pub gated: FrameBuffer,
}

/// Aligns radar data onto the LIDAR frame for a fixed rig.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadarAligner {
    mount: MountTransform,
}

impl RadarAligner {
    pub fn new(mount: MountTransform) -> Self {
        Self { mount }
    }

    /// Align `snapshot` and gate `lidar` through `radar`'s envelope.
    #[instrument(name = "align_radar", skip_all, fields(radar = radar.id()))]
    pub fn align(&self, snapshot: &[Point3D], radar: &dyn RadarSource, lidar: &[Point3D]) -> Alignment {
        let radar_aligned = self.mount.align(snapshot);
        let gated = radar.gate_filter(lidar, &self.mount);
        debug!(
            radar_points = radar_aligned.len(),
            gated = gated.len(),
            "radar aligned"
        );
        Alignment {
            radar_aligned,
            gated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigfuse_hal::SimRadar;
    use rigfuse_perception::DetectionEnvelope;
    use rigfuse_types::{MountAxes, MountOffset};

    fn radar() -> SimRadar {
        SimRadar::with_targets(vec![]).with_envelope(DetectionEnvelope::from_degrees(0.0, 100.0, 90.0, 30.0))
    }

    #[test]
    fn empty_snapshot_yields_empty_radar_cloud() {
        let aligner = RadarAligner::new(MountTransform::new(
            MountOffset::new(24.0, -10.0, -8.0),
            MountAxes::default(),
        ));
        let out = aligner.align(&[], &radar(), &[]);
        assert!(out.radar_aligned.is_empty());
        assert!(out.gated.is_empty());
    }

    #[test]
    fn snapshot_is_translated_by_mount_offset() {
        let aligner = RadarAligner::new(MountTransform::new(
            MountOffset::new(2.0, 16.0, 11.0),
            MountAxes::default(),
        ));
        let out = aligner.align(&[Point3D::new(0.0, 100.0, 0.0)], &radar(), &[]);
        assert_eq!(out.radar_aligned, vec![Point3D::new(16.0, 89.0, 2.0)]);
    }

    #[test]
    fn gated_points_come_from_the_lidar_buffer() {
        let aligner = RadarAligner::default();
        let lidar = vec![
            Point3D::new(0.0, 10.0, 0.0),
            Point3D::NON_RETURN,
            Point3D::new(0.0, -10.0, 0.0),
            Point3D::new(3.0, 40.0, -2.0),
        ];
        let out = aligner.align(&[Point3D::new(1.0, 1.0, 1.0)], &radar(), &lidar);

        assert_eq!(out.gated.len(), 2);
        for p in &out.gated {
            assert!(lidar.contains(p), "{p:?} is not a lidar point");
        }
    }
}
