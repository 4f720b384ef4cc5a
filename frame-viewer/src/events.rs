//! Events reported to the application during playback.

use frame_common::Progress;

/// Why a frame was requested again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    ChecksumMismatch,
    UndecodableImage,
}

/// Events sent from the viewer to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// A frame arrived intact.
    FrameReceived {
        video: String,
        index: u32,
        bytes: usize,
        /// True when the relay answered from its cache.
        from_cache: bool,
        progress: Progress,
        /// Congestion window after this frame.
        window: u32,
        threshold: u32,
        /// Instantaneous rate since the previous frame.
        fps: Option<f64>,
    },

    /// A frame failed verification and is being requested again.
    Retry {
        video: String,
        index: u32,
        attempt: u32,
        reason: RetryReason,
    },

    /// `play` completed.
    Finished {
        video: String,
        frames: u32,
        from_cache: u32,
        retries: u32,
    },

    /// The viewer sent `DISCONNECT` and closed the connection.
    Disconnected,
}
