//! Generic `LidarCapture` trait for rotating-LIDAR capture sources.

use rigfuse_types::LaserReturn;

/// A rotating LIDAR that delivers one batch of returns per rotation.
///
/// Implementations buffer packets internally; [`next_batch`][Self::next_batch]
/// may block, but only up to the source's own timeout.
pub trait LidarCapture: Send {
    /// Human-readable identifier, e.g. `"replay:/data/run7.jsonl"`.
    fn source_id(&self) -> &str;

    /// `true` once the source has been opened successfully and until
    /// [`close`][Self::close].
    fn is_open(&self) -> bool;

    /// `false` once the source is exhausted (end of a recording, frame limit
    /// reached) or closed.
    fn is_running(&self) -> bool;

    /// Pull the next rotation.
    ///
    /// An empty batch means "no data this tick" and is not an error.
    fn next_batch(&mut self) -> Vec<LaserReturn>;

    /// Release the underlying resources.  Idempotent.
    fn close(&mut self);
}
