//! Single-slot, latest-value-wins handoff for radar snapshots.
//!
//! The radar worker is the sole writer and replaces the slot on every frame;
//! the fusion loop reads whatever is there without ever blocking.  Built on
//! [`tokio::sync::watch`], which keeps exactly one value and never queues.

use std::sync::Arc;

use rigfuse_types::Point3D;
use tokio::sync::watch;

/// Create a connected writer/reader pair holding an empty snapshot.
pub fn snapshot_mailbox() -> (SnapshotWriter, SnapshotReader) {
    let (tx, rx) = watch::channel::<Arc<[Point3D]>>(Arc::from(Vec::<Point3D>::new()));
    (SnapshotWriter { tx }, SnapshotReader { rx })
}

/// Write half, owned by the radar ingestion worker.
#[derive(Debug)]
pub struct SnapshotWriter {
    tx: watch::Sender<Arc<[Point3D]>>,
}

impl SnapshotWriter {
    /// Replace the current snapshot.  Succeeds even when no reader exists.
    pub fn publish(&self, points: Vec<Point3D>) {
        self.tx.send_replace(Arc::from(points));
    }

    /// Replace the current snapshot with an empty one.
    pub fn clear(&self) {
        self.publish(Vec::new());
    }
}

/// Read half, polled by the fusion loop once per tick.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Arc<[Point3D]>>,
}

impl SnapshotReader {
    /// The most recently published snapshot.  Never blocks.
    pub fn latest(&self) -> Arc<[Point3D]> {
        Arc::clone(&self.rx.borrow())
    }
}
