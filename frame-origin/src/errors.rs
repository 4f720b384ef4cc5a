//! Error types for frame storage.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by a [`FrameStore`](crate::store::FrameStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// No frames are known for this video name.
    #[error("Unknown video: {0}")]
    UnknownVideo(String),

    /// The index is outside `[0, count)`.
    #[error("Frame {index} out of range for {video} ({count} frames)")]
    OutOfRangeFrame { video: String, index: u32, count: usize },

    /// Reading a frame file failed.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// True for requests the origin answers with silence rather than a log
    /// at error level: unknown videos and out-of-range indices.
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::UnknownVideo(_) | Self::OutOfRangeFrame { .. })
    }
}
