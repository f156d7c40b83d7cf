//! Live capture of decoded LIDAR rotations over UDP.
//!
//! Packet-level decoding belongs to the sensor's wire-protocol library.  That
//! decoder forwards each finished rotation as one datagram holding a JSON
//! array of returns; [`UdpCapture`] receives them with a bounded wait so the
//! fusion loop never stalls.  Any receive error other than a timeout or an
//! interrupted call closes the capture.

use std::io::{self, ErrorKind};
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::time::Duration;

use rigfuse_types::{LaserReturn, RigError};
use tracing::{info, warn};

use crate::capture::LidarCapture;

/// Largest datagram accepted.
const MAX_DATAGRAM: usize = 65_507;

/// Receives decoded rotations from a live sensor bridge.
pub struct UdpCapture {
    id: String,
    socket: Option<UdpSocket>,
    buf: Vec<u8>,
}

impl UdpCapture {
    /// Bind `address:port`; each receive waits at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::CaptureUnavailable`] if the socket cannot be bound
    /// or configured.
    pub fn bind(address: IpAddr, port: u16, timeout: Duration) -> Result<Self, RigError> {
        let addr = SocketAddr::new(address, port);
        let id = format!("udp:{addr}");
        let unavailable = |e: std::io::Error| RigError::CaptureUnavailable {
            source_id: id.clone(),
            details: e.to_string(),
        };

        let socket = UdpSocket::bind(addr).map_err(unavailable)?;
        // A zero timeout would make reads block forever.
        socket
            .set_read_timeout(Some(timeout.max(Duration::from_millis(1))))
            .map_err(unavailable)?;

        info!(source = %id, "udp capture bound");
        Ok(Self {
            id,
            socket: Some(socket),
            buf: vec![0u8; MAX_DATAGRAM],
        })
    }

    /// The bound address (useful when binding port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Classify a failed receive. Timeouts and interrupts are an empty tick;
    /// anything else would fail again on every tick, so the socket is dropped
    /// and the capture stops running.
    fn receive_failed(&mut self, e: io::Error) {
        match e.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {}
            _ => {
                warn!(source = %self.id, error = %e, "udp receive failed; closing capture");
                self.socket = None;
            }
        }
    }
}

impl LidarCapture for UdpCapture {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    fn is_running(&self) -> bool {
        self.is_open()
    }

    fn next_batch(&mut self) -> Vec<LaserReturn> {
        let Some(socket) = self.socket.as_ref() else {
            return Vec::new();
        };

        let len = match socket.recv_from(&mut self.buf) {
            Ok((len, _peer)) => len,
            Err(e) => {
                self.receive_failed(e);
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<LaserReturn>>(&self.buf[..len]) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(source = %self.id, bytes = len, error = %e, "dropping malformed rotation");
                Vec::new()
            }
        }
    }

    fn close(&mut self) {
        self.socket = None;
    }
}
