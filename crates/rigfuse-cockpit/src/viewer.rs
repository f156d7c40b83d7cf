//! [`CockpitViewer`] – the browser display as a [`SceneSink`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rigfuse_hal::SceneSink;
use rigfuse_types::{CloudTag, RigError, Rgb, Scene};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use crate::server::CockpitServer;

/// Frames buffered per browser before a slow tab starts skipping.
const FRAME_BACKLOG: usize = 4;

/// Wire form of a [`Scene`] as streamed to the browser.
#[derive(Debug, Serialize)]
pub struct ViewerFrame {
    pub frame_id: u64,
    /// Capture time as Unix milliseconds, so the page can show frame age.
    pub captured_at_ms: i64,
    pub clouds: Vec<ViewerCloud>,
}

#[derive(Debug, Serialize)]
pub struct ViewerCloud {
    pub tag: CloudTag,
    pub color: Rgb,
    /// `[x, y, z]` triples; non-return points are omitted.
    pub points: Vec<[f32; 3]>,
}

impl From<&Scene> for ViewerFrame {
    fn from(scene: &Scene) -> Self {
        let clouds = scene
            .clouds
            .iter()
            .map(|cloud| ViewerCloud {
                tag: cloud.tag,
                color: cloud.color,
                points: cloud
                    .points
                    .iter()
                    .filter(|p| p.is_valid())
                    .map(|p| [p.x, p.y, p.z])
                    .collect(),
            })
            .collect();
        Self {
            frame_id: scene.frame_id,
            captured_at_ms: scene.captured_at.timestamp_millis(),
            clouds,
        }
    }
}

/// Streams each presented scene to every connected browser tab.
pub struct CockpitViewer {
    frames: broadcast::Sender<Arc<str>>,
    close_flag: Arc<AtomicBool>,
    server: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
    closed: bool,
}

impl CockpitViewer {
    /// Bind `0.0.0.0:port` and start serving on `runtime`.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::Display`] if the port cannot be bound.
    pub fn launch(port: u16, runtime: Handle) -> Result<Self, RigError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let fail = |e: std::io::Error| RigError::Display {
            details: format!("viewer bind error on {addr}: {e}"),
        };

        let std_listener = std::net::TcpListener::bind(addr).map_err(fail)?;
        std_listener.set_nonblocking(true).map_err(fail)?;
        let listener = {
            let _guard = runtime.enter();
            TcpListener::from_std(std_listener).map_err(fail)?
        };
        let local_addr = listener.local_addr().ok();

        let (frames, _) = broadcast::channel(FRAME_BACKLOG);
        let close_flag = Arc::new(AtomicBool::new(false));
        let server = CockpitServer::new(frames.clone(), Arc::clone(&close_flag));
        let task = runtime.spawn(server.serve(listener));

        Ok(Self {
            frames,
            close_flag,
            server: Some(task),
            local_addr,
            closed: false,
        })
    }

    /// Shared close flag; raising it (e.g. from a Ctrl-C handler) has the
    /// same effect as pressing `q` in the browser.
    pub fn close_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.close_flag)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl SceneSink for CockpitViewer {
    fn present(&mut self, scene: &Scene) -> Result<(), RigError> {
        if self.closed {
            return Err(RigError::Display {
                details: "viewer is closed".to_string(),
            });
        }
        let json = serde_json::to_string(&ViewerFrame::from(scene)).map_err(|e| RigError::Display {
            details: format!("scene serialization failed: {e}"),
        })?;
        // No attached tabs is not an error.
        let _ = self.frames.send(Arc::from(json));
        Ok(())
    }

    fn close_requested(&self) -> bool {
        self.closed || self.close_flag.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        if let Some(task) = self.server.take() {
            task.abort();
            info!("viewer stopped");
        }
        self.closed = true;
    }
}

impl Drop for CockpitViewer {
    fn drop(&mut self) {
        self.close();
    }
}
