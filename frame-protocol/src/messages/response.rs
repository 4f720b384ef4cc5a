//! Binary frame responses.
//!
//! # Wire Format
//!
//! - 4 bytes: payload length (u32, big-endian)
//! - N bytes: payload
//! - 4 bytes: checksum (i32, big-endian)
//! - 1 byte: provenance flag (relay -> viewer only; 1 = served from cache)

use bytes::Bytes;

use crate::errors::ProtocolError;
use crate::io::{FrameInStream, FrameOutStream};
use tokio::io::{AsyncRead, AsyncWrite};

/// Largest payload the codec will accept (64 MiB).
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Which link a frame travels on; decides whether the provenance byte is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    /// Origin -> relay. No provenance byte.
    Origin,
    /// Relay -> viewer. Trailing provenance byte.
    Viewer,
}

/// Additive checksum: the sum of all bytes as unsigned 8-bit values,
/// accumulated in a wrapping 32-bit integer.
///
/// This is a compatibility checksum, not an integrity guarantee.
pub fn checksum(data: &[u8]) -> i32 {
    data.iter()
        .fold(0i32, |acc, &b| acc.wrapping_add(i32::from(b)))
}

/// One frame reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameResponse {
    /// Encoded image bytes.
    pub payload: Bytes,
    /// Checksum as sent by the peer (not necessarily valid).
    pub checksum: i32,
    /// Cache provenance; `None` on the origin leg.
    pub from_cache: Option<bool>,
}

impl FrameResponse {
    /// Create a response for `payload` with a freshly computed checksum.
    pub fn new(payload: Bytes) -> Self {
        let checksum = checksum(&payload);
        Self {
            payload,
            checksum,
            from_cache: None,
        }
    }

    /// Create a response that carries a checksum received from elsewhere.
    pub fn with_checksum(payload: Bytes, checksum: i32) -> Self {
        Self {
            payload,
            checksum,
            from_cache: None,
        }
    }

    /// Set the provenance flag for the relay -> viewer leg.
    #[must_use]
    pub fn from_cache(mut self, from_cache: bool) -> Self {
        self.from_cache = Some(from_cache);
        self
    }

    /// Returns true if the carried checksum matches the payload.
    pub fn verify(&self) -> bool {
        checksum(&self.payload) == self.checksum
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns true for an empty payload.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Read a frame response from an input stream.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Io`] if the length header cannot be read
    /// - [`ProtocolError::FrameTooLarge`] if the declared length exceeds [`MAX_FRAME_LEN`]
    /// - [`ProtocolError::MalformedFrame`] if the stream ends inside the frame
    /// - [`ProtocolError::InvalidFlag`] if the provenance byte is not 0 or 1
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut FrameInStream<R>,
        leg: Leg,
    ) -> Result<Self, ProtocolError> {
        let length = stream.read_u32().await?;
        if length > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge(length));
        }

        let malformed = |source| ProtocolError::MalformedFrame {
            expected: length,
            source,
        };
        let payload = stream.read_payload(length as usize).await.map_err(malformed)?;
        let checksum = stream.read_i32().await.map_err(malformed)?;

        let from_cache = match leg {
            Leg::Origin => None,
            Leg::Viewer => match stream.read_u8().await.map_err(malformed)? {
                0 => Some(false),
                1 => Some(true),
                other => return Err(ProtocolError::InvalidFlag(other)),
            },
        };

        Ok(Self {
            payload,
            checksum,
            from_cache,
        })
    }

    /// Write this response to an output stream.
    ///
    /// On the viewer leg a missing provenance flag is written as `false`.
    /// The frame is buffered; call `flush()` to send it.
    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut FrameOutStream<W>, leg: Leg) {
        // Payloads are bounded by MAX_FRAME_LEN on read and by the store on origin.
        stream.write_u32(self.payload.len() as u32);
        stream.write_bytes(&self.payload);
        stream.write_i32(self.checksum);
        if leg == Leg::Viewer {
            stream.write_u8(u8::from(self.from_cache.unwrap_or(false)));
        }
    }
}
