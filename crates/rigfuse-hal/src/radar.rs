//! Generic `RadarSource` trait for the radar ingestion subsystem.

use std::sync::Arc;

use rigfuse_perception::{DetectionEnvelope, MountTransform};
use rigfuse_types::{FrameBuffer, Point3D, RigError};

/// A radar whose point buffer is refreshed by a concurrent worker.
///
/// Readers only ever see whole snapshots; two calls to
/// [`snapshot`][Self::snapshot] within one frame may return different data.
pub trait RadarSource: Send {
    /// Stable identifier, e.g. `"tcp:12345"`.
    fn id(&self) -> &str;

    /// Spawn the ingestion worker.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::RadarFault`] when the worker cannot be started
    /// (e.g. the listening port is taken).
    fn start(&mut self) -> Result<(), RigError>;

    /// The latest complete radar frame, in the radar's own frame.  Never
    /// blocks; an empty snapshot is normal.
    fn snapshot(&self) -> Arc<[Point3D]>;

    /// The volume this radar reports valid detections in.
    fn envelope(&self) -> &DetectionEnvelope;

    /// LIDAR-frame points that fall inside this radar's envelope.
    fn gate_filter(&self, lidar_points: &[Point3D], mount: &MountTransform) -> FrameBuffer {
        self.envelope().gate(lidar_points, mount)
    }

    /// Stop the worker and release the port.  Idempotent.
    fn close(&mut self);
}
