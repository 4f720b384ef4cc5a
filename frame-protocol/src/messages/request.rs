//! Text request lines.
//!
//! # Wire Format
//!
//! One UTF-8 line per request, terminated by `\n`:
//!
//! - `<video> <index>` - request frame `index` of `video`
//! - `PING` - liveness probe, never answered
//! - `DISCONNECT` - graceful close
//! - `NACK <index>` - checksum failure report for `index`

use std::fmt;

use crate::errors::ProtocolError;
use crate::io::{FrameInStream, FrameOutStream, MAX_LINE_LEN};
use tokio::io::{AsyncRead, AsyncWrite};

const PING: &str = "PING";
const DISCONNECT: &str = "DISCONNECT";
const NACK: &str = "NACK";

/// A single request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Request frame `index` of `video`.
    Frame { video: String, index: u32 },
    /// Liveness probe.
    Ping,
    /// Graceful close of the session.
    Disconnect,
    /// Negative acknowledgment for a frame whose checksum did not verify.
    Nack { index: u32 },
}

impl Request {
    /// Parse a request line.
    ///
    /// Surrounding whitespace is ignored. Tokens are separated by exactly one
    /// space, so `"marc  7"` (two spaces) is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidRequestFormat`] if the line is not one
    /// of the four known forms.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        match line {
            PING => return Ok(Self::Ping),
            DISCONNECT => return Ok(Self::Disconnect),
            _ => {}
        }

        let parts: Vec<&str> = line.split(' ').collect();
        let [first, second] = parts.as_slice() else {
            return Err(ProtocolError::InvalidRequestFormat(format!(
                "expected 2 tokens, got {}: {:?}",
                parts.len(),
                line
            )));
        };

        let index = parse_index(second, line)?;
        if *first == NACK {
            Ok(Self::Nack { index })
        } else if first.is_empty() {
            Err(ProtocolError::InvalidRequestFormat(format!(
                "empty video name: {:?}",
                line
            )))
        } else {
            Ok(Self::Frame {
                video: (*first).to_string(),
                index,
            })
        }
    }

    /// Convenience constructor for a frame request.
    pub fn frame(video: impl Into<String>, index: u32) -> Self {
        Self::Frame {
            video: video.into(),
            index,
        }
    }

    /// Read the next request from an input stream.
    ///
    /// Returns `Ok(None)` when the peer closed the stream. A line that is not
    /// valid UTF-8 or exceeds the maximum line length is consumed and reported
    /// as [`ProtocolError::InvalidRequestFormat`], leaving the stream usable.
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut FrameInStream<R>,
    ) -> Result<Option<Self>, ProtocolError> {
        match stream.read_line(MAX_LINE_LEN).await {
            Ok(Some(line)) => Self::parse(&line).map(Some),
            Ok(None) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                Err(ProtocolError::InvalidRequestFormat(e.to_string()))
            }
            Err(e) => Err(ProtocolError::Io(e)),
        }
    }

    /// Write this request (with its newline) to an output stream.
    ///
    /// The request is buffered; call `flush()` to send it.
    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut FrameOutStream<W>) {
        stream.write_line(&self.to_string());
    }
}

fn parse_index(token: &str, line: &str) -> Result<u32, ProtocolError> {
    // u32::from_str accepts a leading '+', the wire format does not.
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::InvalidRequestFormat(format!(
            "frame index is not a non-negative integer: {:?}",
            line
        )));
    }
    token.parse::<u32>().map_err(|_| {
        ProtocolError::InvalidRequestFormat(format!("frame index out of range: {:?}", line))
    })
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame { video, index } => write!(f, "{} {}", video, index),
            Self::Ping => f.write_str(PING),
            Self::Disconnect => f.write_str(DISCONNECT),
            Self::Nack { index } => write!(f, "{} {}", NACK, index),
        }
    }
}
