//! Error types for the viewer.

use frame_protocol::ProtocolError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while playing a video.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// Could not reach the relay.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A received frame did not match its checksum.
    #[error("Checksum mismatch for frame {index}: expected {expected}, computed {actual}")]
    ChecksumMismatch { index: u32, expected: i32, actual: i32 },

    /// The relay did not answer in time.
    #[error("No reply within {0:?}")]
    Timeout(Duration),

    /// A frame kept failing verification.
    #[error("Giving up on {video} frame {index} after {attempts} attempts")]
    RetriesExhausted { video: String, index: u32, attempts: u32 },

    /// Malformed data from the relay.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O failure on the relay connection or output directory.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ViewerError {
    /// Returns true if the connection is still usable after this error.
    ///
    /// A timeout leaves a reply possibly in flight, so it counts as fatal.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch { .. } | Self::RetriesExhausted { .. } | Self::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        assert!(ViewerError::RetriesExhausted {
            video: "marc".into(),
            index: 3,
            attempts: 17
        }
        .is_recoverable());
        assert!(!ViewerError::Timeout(Duration::from_secs(10)).is_recoverable());
        assert!(!ViewerError::Io(io::Error::from(io::ErrorKind::BrokenPipe)).is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = ViewerError::ChecksumMismatch {
            index: 4,
            expected: 10,
            actual: 11,
        };
        assert_eq!(
            err.to_string(),
            "Checksum mismatch for frame 4: expected 10, computed 11"
        );
    }
}
