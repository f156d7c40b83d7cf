//! Recorded-capture replay.
//!
//! A recording is a text file with one rotation per line, each line a JSON
//! array of returns:
//!
//! ```text
//! [{"distance":312.5,"azimuth":0.0,"vertical":-15.0}, ...]
//! [{"distance":0.0,"azimuth":0.2,"vertical":-15.0}, ...]
//! ```
//!
//! Blank lines replay as empty rotations.  A malformed line is logged and
//! also replays as an empty rotation.  End of file ends the run.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::Path;

use rigfuse_types::{LaserReturn, RigError};
use tracing::{debug, info, warn};

use crate::capture::LidarCapture;

/// Replays a recorded capture file rotation by rotation.
pub struct ReplayCapture {
    id: String,
    lines: Option<Lines<BufReader<File>>>,
    line_no: usize,
    exhausted: bool,
}

impl ReplayCapture {
    /// Open a recording.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::CaptureUnavailable`] when the file cannot be
    /// opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RigError> {
        let path = path.as_ref();
        let id = format!("replay:{}", path.display());
        let file = File::open(path).map_err(|e| RigError::CaptureUnavailable {
            source_id: id.clone(),
            details: e.to_string(),
        })?;
        info!(source = %id, "replay capture opened");
        Ok(Self {
            id,
            lines: Some(BufReader::new(file).lines()),
            line_no: 0,
            exhausted: false,
        })
    }

    /// Append one rotation to a recording in the format [`open`][Self::open]
    /// reads.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::Decode`] if the batch cannot be serialised or
    /// written.
    pub fn write_rotation<W: Write>(writer: &mut W, returns: &[LaserReturn]) -> Result<(), RigError> {
        serde_json::to_writer(&mut *writer, returns)
            .map_err(|e| RigError::Decode(format!("failed to encode rotation: {e}")))?;
        writer
            .write_all(b"\n")
            .map_err(|e| RigError::Decode(format!("failed to write rotation: {e}")))
    }
}

impl LidarCapture for ReplayCapture {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.lines.is_some()
    }

    fn is_running(&self) -> bool {
        self.is_open() && !self.exhausted
    }

    fn next_batch(&mut self) -> Vec<LaserReturn> {
        let Some(lines) = self.lines.as_mut() else {
            return Vec::new();
        };

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                warn!(source = %self.id, error = %e, "replay read failed; ending run");
                self.exhausted = true;
                return Vec::new();
            }
            None => {
                debug!(source = %self.id, rotations = self.line_no, "replay exhausted");
                self.exhausted = true;
                return Vec::new();
            }
        };
        self.line_no += 1;

        if line.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str::<Vec<LaserReturn>>(&line) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(source = %self.id, line = self.line_no, error = %e, "skipping malformed rotation");
                Vec::new()
            }
        }
    }

    fn close(&mut self) {
        self.lines = None;
    }
}
