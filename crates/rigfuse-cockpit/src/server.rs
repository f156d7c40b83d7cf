//! [`CockpitServer`] – HTTP + WebSocket server for the viewer page.
//!
//! The listener is bound by the caller (see
//! [`CockpitViewer::launch`][crate::CockpitViewer::launch]) and handed to
//! [`CockpitServer::serve`].
//!
//! * Regular HTTP requests → 200 OK with the embedded viewer HTML.
//! * WebSocket upgrades → scene frames downstream, close requests upstream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use rigfuse_types::RigError;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Default TCP port for the viewer.
pub const DEFAULT_PORT: u16 = 8080;

/// Upstream topic that asks the fusion loop to stop.
pub const CLOSE_TOPIC: &str = "/viewer/close";

/// The compiled-in viewer page (HTML + JS).
pub(crate) const VIEWER_HTML: &str = include_str!("viewer.html");

fn display_error(details: String) -> RigError {
    RigError::Display { details }
}

// ---------------------------------------------------------------------------
// CockpitServer
// ---------------------------------------------------------------------------

/// Serves the viewer page and fans serialized frames out to every connected
/// browser.
pub struct CockpitServer {
    frames: broadcast::Sender<Arc<str>>,
    close_flag: Arc<AtomicBool>,
}

impl CockpitServer {
    /// Create a server that streams whatever is sent on `frames` and raises
    /// `close_flag` on request.
    pub fn new(frames: broadcast::Sender<Arc<str>>, close_flag: Arc<AtomicBool>) -> Self {
        Self { frames, close_flag }
    }

    /// Accept connections on an already bound `listener` forever.
    pub async fn serve(self, listener: TcpListener) {
        if let Ok(addr) = listener.local_addr() {
            info!("viewer listening on http://localhost:{}", addr.port());
        }

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let frames = self.frames.subscribe();
                    let close_flag = Arc::clone(&self.close_flag);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, frames, close_flag).await {
                            warn!(%peer, error = %e, "viewer client error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "viewer accept error"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-connection handler
// ---------------------------------------------------------------------------

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    frames: broadcast::Receiver<Arc<str>>,
    close_flag: Arc<AtomicBool>,
) -> Result<(), RigError> {
    // `peek` leaves the request in place for tungstenite's handshake.
    let mut buf = [0u8; 1024];
    let n = stream
        .peek(&mut buf)
        .await
        .map_err(|e| display_error(format!("peek error from {peer}: {e}")))?;

    let header_preview = String::from_utf8_lossy(&buf[..n]);
    if is_websocket_upgrade(&header_preview) {
        handle_ws(stream, peer, frames, close_flag).await
    } else {
        serve_html(stream, n).await
    }
}

fn is_websocket_upgrade(request_head: &str) -> bool {
    request_head.lines().any(|line| {
        let line = line.to_ascii_lowercase();
        line.starts_with("upgrade:") && line.contains("websocket")
    })
}

// ---------------------------------------------------------------------------
// Plain HTTP: serve the embedded viewer
// ---------------------------------------------------------------------------

async fn serve_html(mut stream: TcpStream, peeked: usize) -> Result<(), RigError> {
    // Drain the peeked request so closing the socket does not reset it.
    let mut request = [0u8; 1024];
    stream
        .read_exact(&mut request[..peeked])
        .await
        .map_err(|e| display_error(format!("HTTP read error: {e}")))?;

    let body = VIEWER_HTML;
    let response = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        body.len(),
        body
    );
    stream
        .write_all(response.as_bytes())
        .await
        .map_err(|e| display_error(format!("HTTP write error: {e}")))
}

// ---------------------------------------------------------------------------
// WebSocket: frames down, close requests up
// ---------------------------------------------------------------------------

async fn handle_ws(
    stream: TcpStream,
    peer: SocketAddr,
    mut frames: broadcast::Receiver<Arc<str>>,
    close_flag: Arc<AtomicBool>,
) -> Result<(), RigError> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| display_error(format!("WS handshake from {peer}: {e}")))?;
    debug!(%peer, "viewer attached");

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    loop {
        tokio::select! {
            result = frames.recv() => {
                match result {
                    Ok(frame) => {
                        if ws_tx.send(Message::Text(frame.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    // A slow tab just misses frames.
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(%peer, skipped = n, "viewer lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_upstream_message(text.as_str(), &close_flag);
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    debug!(%peer, "viewer detached");
    Ok(())
}

// ---------------------------------------------------------------------------
// Upstream message parser
// ---------------------------------------------------------------------------

/// Handle a text message from the browser.
///
/// | Topic | Effect |
/// |---|---|
/// | `/viewer/close` | Raises the close flag |
///
/// Anything else is ignored.  Returns true when the message raised the flag.
pub(crate) fn handle_upstream_message(text: &str, close_flag: &AtomicBool) -> bool {
    let Ok(json) = serde_json::from_str::<Value>(text) else {
        return false;
    };

    let topic = json.get("topic").and_then(|t| t.as_str()).unwrap_or("");
    if topic == CLOSE_TOPIC {
        info!("close requested from viewer");
        close_flag.store(true, Ordering::SeqCst);
        return true;
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
