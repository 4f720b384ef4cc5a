//! Common types shared across the frame relay workspace.
//!
//! This crate provides small value types used by every other crate:
//! - [`FrameKey`] - a (video name, frame index) pair
//! - [`Progress`] - playback progress as `current / total`
//! - [`hit_rate`] - percentage helper for cache statistics

use std::fmt;

/// Identifies a single frame of a single video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameKey {
    pub video: String,
    pub index: u32,
}

impl FrameKey {
    /// Create a new frame key.
    pub fn new(video: impl Into<String>, index: u32) -> Self {
        Self {
            video: video.into(),
            index,
        }
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.video, self.index)
    }
}

/// Playback progress, reported as `current / total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Frames delivered so far.
    pub current: u32,
    /// Frames requested in total.
    pub total: u32,
}

impl Progress {
    /// Create a new progress value.
    pub const fn new(current: u32, total: u32) -> Self {
        Self { current, total }
    }

    /// Returns true once every requested frame has been delivered.
    pub const fn is_complete(&self) -> bool {
        self.current >= self.total
    }

    /// Completion as a percentage (0.0 - 100.0). An empty request is complete.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            100.0 * f64::from(self.current.min(self.total)) / f64::from(self.total)
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.current, self.total)
    }
}

/// Hit rate as a percentage. Returns 0.0 when there were no accesses.
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        100.0 * hits as f64 / total as f64
    }
}
