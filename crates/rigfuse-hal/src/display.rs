//! Generic `SceneSink` trait for the display surface.

use rigfuse_types::{RigError, Scene};

/// A surface that redraws one [`Scene`] per frame and owns the window (or
/// client connection) lifecycle.
pub trait SceneSink: Send {
    /// Replace whatever is currently shown with `scene`.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::Display`] when the scene cannot be delivered.
    fn present(&mut self, scene: &Scene) -> Result<(), RigError>;

    /// `true` once the user (or the operator) has asked to close the view.
    fn close_requested(&self) -> bool;

    /// Tear down the display.  Idempotent.
    fn close(&mut self);
}
