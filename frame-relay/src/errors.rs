//! Error types for the relay.

use std::io;
use std::time::Duration;

use frame_protocol::ProtocolError;
use thiserror::Error;

/// Errors that can occur while relaying frames.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Could not establish a connection (listener bind or origin connect).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// I/O failure on an established connection.
    #[error("Connection lost: {0}")]
    ConnectionLost(#[from] io::Error),

    /// Malformed data on the wire.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A peer stayed silent for too long.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// The origin link is broken; misses cannot be resolved.
    #[error("Origin link unavailable")]
    OriginUnavailable,

    /// The origin did not answer a request (unknown video or frame).
    #[error("Origin sent no reply to {0:?}")]
    NoReply(String),

    /// Internal error (should not happen in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns true if this error, raised on a client connection, must end
    /// that client's session.
    ///
    /// Origin-side failures never end a session: the client simply gets no
    /// reply for that request.
    #[must_use]
    pub fn is_session_fatal(&self) -> bool {
        match self {
            Self::ConnectionLost(_) | Self::Timeout(_) | Self::Internal(_) => true,
            Self::Protocol(e) => e.is_fatal(),
            Self::Config(_)
            | Self::ConnectionFailed(_)
            | Self::OriginUnavailable
            | Self::NoReply(_) => false,
        }
    }
}
