//! [`TcpRadar`] – network radar ingestion.
//!
//! The radar's processing host connects to a TCP port and streams one frame
//! per line, each line a JSON array of `[x, y, z]` points in the radar frame:
//!
//! ```text
//! [[12.0, 250.5, -3.0], [40.2, 310.0, 1.5]]
//! ```
//!
//! A tokio task accepts one producer at a time, which keeps the snapshot
//! mailbox single-writer.  Every well-formed line replaces the snapshot;
//! malformed lines are logged and dropped; a disconnect clears the snapshot so
//! stale targets are not fused.  A producer that sends a line longer than
//! [`MAX_FRAME_LINE`] bytes is disconnected.

use std::net::SocketAddr;
use std::sync::Arc;

use rigfuse_perception::DetectionEnvelope;
use rigfuse_types::{Point3D, RigError};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::mailbox::{SnapshotReader, SnapshotWriter, snapshot_mailbox};
use crate::radar::RadarSource;

/// Default radar ingestion port.
pub const DEFAULT_RADAR_PORT: u16 = 12345;

/// Longest accepted frame line, newline excluded.
pub const MAX_FRAME_LINE: usize = 1 << 20;

/// Radar fed by a line-delimited JSON TCP stream.
pub struct TcpRadar {
    id: String,
    bind_addr: SocketAddr,
    envelope: DetectionEnvelope,
    runtime: Handle,
    writer: Option<SnapshotWriter>,
    reader: SnapshotReader,
    worker: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl TcpRadar {
    /// Create a radar that will listen on `bind_addr` once started.  The
    /// ingestion worker runs on `runtime`.
    pub fn new(bind_addr: SocketAddr, envelope: DetectionEnvelope, runtime: Handle) -> Self {
        let (writer, reader) = snapshot_mailbox();
        Self {
            id: format!("tcp:{bind_addr}"),
            bind_addr,
            envelope,
            runtime,
            writer: Some(writer),
            reader,
            worker: None,
            local_addr: None,
        }
    }

    /// The address actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl RadarSource for TcpRadar {
    fn id(&self) -> &str {
        &self.id
    }

    fn start(&mut self) -> Result<(), RigError> {
        let writer = self.writer.take().ok_or_else(|| RigError::RadarFault {
            details: format!("{} already started", self.id),
        })?;
        let fault = |e: std::io::Error| RigError::RadarFault {
            details: format!("bind error on {}: {e}", self.bind_addr),
        };

        let std_listener = std::net::TcpListener::bind(self.bind_addr).map_err(fault)?;
        std_listener.set_nonblocking(true).map_err(fault)?;
        let listener = {
            let _guard = self.runtime.enter();
            TcpListener::from_std(std_listener).map_err(fault)?
        };
        self.local_addr = listener.local_addr().ok();

        info!(radar = %self.id, addr = ?self.local_addr, "radar ingestion listening");
        self.worker = Some(self.runtime.spawn(ingest(listener, writer, self.id.clone())));
        Ok(())
    }

    fn snapshot(&self) -> Arc<[Point3D]> {
        self.reader.latest()
    }

    fn envelope(&self) -> &DetectionEnvelope {
        &self.envelope
    }

    fn close(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
            info!(radar = %self.id, "radar ingestion stopped");
        }
    }
}

impl Drop for TcpRadar {
    fn drop(&mut self) {
        self.close();
    }
}

/// Parse one radar frame line.
///
/// # Errors
///
/// Returns [`RigError::Decode`] when the line is not a JSON array of points.
pub fn parse_frame(line: &str) -> Result<Vec<Point3D>, RigError> {
    serde_json::from_str(line).map_err(|e| RigError::Decode(format!("radar frame: {e}")))
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

async fn ingest(listener: TcpListener, writer: SnapshotWriter, id: String) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(radar = %id, error = %e, "radar accept failed");
                continue;
            }
        };
        info!(radar = %id, %peer, "radar producer connected");
        let frames = serve_producer(stream, &writer, &id).await;
        writer.clear();
        info!(radar = %id, %peer, frames, "radar producer disconnected");
    }
}

async fn serve_producer(stream: TcpStream, writer: &SnapshotWriter, id: &str) -> u64 {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    let mut frames = 0;
    loop {
        line.clear();
        let limit = MAX_FRAME_LINE as u64 + 1;
        match (&mut reader).take(limit).read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) if !line.ends_with(b"\n") && line.len() > MAX_FRAME_LINE => {
                warn!(radar = %id, limit = MAX_FRAME_LINE, "radar frame too long; dropping producer");
                break;
            }
            Ok(_) => {
                let Ok(text) = std::str::from_utf8(&line) else {
                    warn!(radar = %id, "dropping non-UTF-8 radar frame");
                    continue;
                };
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                match parse_frame(text) {
                    Ok(points) => {
                        debug!(radar = %id, points = points.len(), "radar frame");
                        writer.publish(points);
                        frames += 1;
                    }
                    Err(e) => warn!(radar = %id, error = %e, "dropping malformed radar frame"),
                }
            }
            Err(e) => {
                warn!(radar = %id, error = %e, "radar stream read failed");
                break;
            }
        }
    }
    frames
}
