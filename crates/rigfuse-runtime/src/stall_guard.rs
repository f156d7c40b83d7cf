//! [`StallGuard`] – detector for runs of empty capture ticks.
//!
//! An empty LIDAR batch is normal and the loop simply retries, but a long run
//! of them usually means the sensor or the recording stopped delivering.
//! The guard counts consecutive empty ticks and fires once when the count
//! reaches its threshold; a rendered frame re-arms it.
//!
//! # Example
//!
//! ```rust
//! use rigfuse_runtime::stall_guard::StallGuard;
//!
//! let mut guard = StallGuard::new(2);
//! assert!(!guard.record_empty());
//! assert!(guard.record_empty()); // second empty tick → fire
//! assert!(!guard.record_empty()); // already reported
//!
//! guard.record_frame();
//! assert!(!guard.is_stalled());
//! ```

/// Counts consecutive empty ticks.
#[derive(Debug, Clone)]
pub struct StallGuard {
    threshold: u64,
    consecutive: u64,
    reported: bool,
}

impl StallGuard {
    /// `threshold` consecutive empty ticks constitute a stall.  A threshold
    /// of 0 disables reporting.
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            consecutive: 0,
            reported: false,
        }
    }

    /// Record an empty tick.  Returns `true` exactly once per stall, on the
    /// tick that reaches the threshold.
    pub fn record_empty(&mut self) -> bool {
        self.consecutive += 1;
        if self.is_stalled() && !self.reported {
            self.reported = true;
            return true;
        }
        false
    }

    /// Record a rendered frame, clearing the streak.
    pub fn record_frame(&mut self) {
        self.consecutive = 0;
        self.reported = false;
    }

    /// Number of empty ticks in the current streak.
    pub fn consecutive(&self) -> u64 {
        self.consecutive
    }

    pub fn is_stalled(&self) -> bool {
        self.threshold > 0 && self.consecutive >= self.threshold
    }
}
