//! Tracker packet parsing
//!
//! The external tracker emits one JSON object per source frame. A recording
//! is the same objects written one per line (JSON lines).

use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{MarionetteError, TrackingError};
use crate::tracking::TrackerFrame;

impl TrackerFrame {
    /// Parse a single JSON packet.
    pub fn from_json(s: &str) -> Result<Self, MarionetteError> {
        serde_json::from_str(s)
            .map_err(|e| TrackingError::Parse(format!("JSON parse error: {}", e)).into())
    }

    /// Parse a JSON packet from raw bytes (e.g. a datagram payload).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MarionetteError> {
        serde_json::from_slice(bytes)
            .map_err(|e| TrackingError::Parse(format!("JSON parse error: {}", e)).into())
    }
}

/// Read a JSON-lines recording, one frame per non-blank line.
pub fn read_recording<P: AsRef<Path>>(path: P) -> Result<Vec<TrackerFrame>, MarionetteError> {
    let file = std::fs::File::open(path.as_ref()).map_err(|e| {
        TrackingError::ReadRecording(format!("{}: {}", path.as_ref().display(), e))
    })?;

    parse_recording(BufReader::new(file))
}

/// Parse JSON lines from any reader.
pub fn parse_recording<R: BufRead>(reader: R) -> Result<Vec<TrackerFrame>, MarionetteError> {
    let mut frames = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let frame: TrackerFrame =
            serde_json::from_str(trimmed).map_err(|e| TrackingError::ParseLine {
                line: idx + 1,
                message: e.to_string(),
            })?;
        frames.push(frame);
    }

    tracing::debug!("Parsed {} tracker frames", frames.len());
    Ok(frames)
}
