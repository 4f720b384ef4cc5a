//! Error types for the frame protocol codec.

use std::io;
use thiserror::Error;

/// Errors produced while encoding or decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A request line did not parse into one of the known commands.
    #[error("Invalid request format: {0}")]
    InvalidRequestFormat(String),

    /// The declared frame length could not be satisfied by the stream.
    #[error("Malformed frame: expected {expected} payload bytes: {source}")]
    MalformedFrame {
        /// Declared payload length.
        expected: u32,
        /// Underlying read failure (EOF, reset, ...).
        #[source]
        source: io::Error,
    },

    /// The declared frame length exceeds the codec limit.
    #[error("Malformed frame: declared length {0} exceeds limit {max}", max = crate::messages::MAX_FRAME_LEN)]
    FrameTooLarge(u32),

    /// The provenance byte was neither 0 nor 1.
    #[error("Malformed frame: cache flag must be 0 or 1, got {0}")]
    InvalidFlag(u8),

    /// I/O error outside of a frame body (header read, write, flush).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Returns true if the error leaves the stream's framing unusable.
    ///
    /// Format errors on request lines are recoverable: the line has been
    /// consumed and the next one can be read. Everything on the binary leg
    /// is fatal to the connection.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidRequestFormat(_))
    }

    /// Returns true if this is a malformed-frame condition.
    #[must_use]
    pub fn is_malformed_frame(&self) -> bool {
        matches!(
            self,
            Self::MalformedFrame { .. } | Self::FrameTooLarge(_) | Self::InvalidFlag(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        assert!(!ProtocolError::InvalidRequestFormat("x".into()).is_fatal());
        assert!(ProtocolError::InvalidFlag(7).is_fatal());
        assert!(ProtocolError::FrameTooLarge(u32::MAX).is_malformed_frame());
        assert!(!ProtocolError::Io(io::Error::from(io::ErrorKind::BrokenPipe)).is_malformed_frame());
    }

    #[test]
    fn test_error_display() {
        let err = ProtocolError::MalformedFrame {
            expected: 10,
            source: io::Error::from(io::ErrorKind::UnexpectedEof),
        };
        assert!(err.to_string().contains("expected 10 payload bytes"));

        let err = ProtocolError::InvalidFlag(2);
        assert_eq!(
            err.to_string(),
            "Malformed frame: cache flag must be 0 or 1, got 2"
        );
    }
}
