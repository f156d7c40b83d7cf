//! `rigfuse-cockpit` – browser viewer for fused scenes.
//!
//! Boots a lightweight HTTP + WebSocket server (default port `8080`) that:
//!
//! 1. **Serves** the embedded viewer page at every non-WebSocket HTTP path.
//!
//! 2. **Streams** every presented [`Scene`] to each connected tab as one JSON
//!    text message.  Non-return points are left out of the stream.
//!
//! 3. **Accepts** `{"topic":"/viewer/close"}` from the browser (sent when the
//!    user presses `q`) and raises the shared close flag, which the fusion
//!    loop observes through [`SceneSink::close_requested`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use rigfuse_cockpit::CockpitViewer;
//! use rigfuse_hal::SceneSink;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let viewer = CockpitViewer::launch(8080, runtime.handle().clone())
//!     .expect("viewer port available");
//! assert!(!viewer.close_requested());
//! ```
//!
//! [`Scene`]: rigfuse_types::Scene
//! [`SceneSink::close_requested`]: rigfuse_hal::SceneSink::close_requested

pub mod server;
pub mod viewer;

pub use server::{CockpitServer, DEFAULT_PORT};
pub use viewer::{CockpitViewer, ViewerFrame};
