//! Buffered I/O streams for the frame protocol.
//!
//! This module provides buffered reading and writing for both legs of the
//! protocol (viewer <-> relay and relay <-> origin): newline-terminated request
//! lines in one direction, big-endian length-prefixed frames in the other.
//!
//! # Examples
//!
//! ```no_run
//! use frame_protocol::io::{FrameInStream, FrameOutStream};
//! use tokio::net::TcpStream;
//!
//! # async fn example() -> std::io::Result<()> {
//! let socket = TcpStream::connect("localhost:5000").await?;
//! let (reader, writer) = socket.into_split();
//!
//! let mut output = FrameOutStream::new(writer);
//! output.write_line("marc 0");
//! output.flush().await?;
//!
//! let mut input = FrameInStream::new(reader);
//! let length = input.read_u32().await?;
//! let payload = input.read_payload(length as usize).await?;
//! let checksum = input.read_i32().await?;
//! # Ok(())
//! # }
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum accepted length of a request line, in bytes (excluding newline).
pub const MAX_LINE_LEN: usize = 4096;

/// Buffered input stream for reading protocol data.
///
/// Primitive reads use network byte order (big-endian). Data is buffered
/// internally, so a read that is cancelled (for example by
/// `tokio::time::timeout`) keeps whatever bytes already arrived; the next
/// read continues from the same position in the stream.
///
/// # Examples
///
/// ```no_run
/// use frame_protocol::io::FrameInStream;
/// # async fn example<R: tokio::io::AsyncRead + Unpin>(reader: R) -> std::io::Result<()> {
/// let mut stream = FrameInStream::new(reader);
///
/// while let Some(line) = stream.read_line(1024).await? {
///     println!("request: {line}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct FrameInStream<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameInStream<R> {
    /// Create a new input stream with default buffer size (8KB).
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, 8192)
    }

    /// Create a new input stream with specified buffer capacity.
    ///
    /// # Arguments
    ///
    /// * `reader` - The underlying async reader
    /// * `capacity` - Initial buffer capacity in bytes
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Ensure at least `n` bytes are available in the buffer.
    ///
    /// Reads from the underlying reader until the buffer contains at least
    /// `n` bytes. Returns an error if EOF is reached before `n` bytes are
    /// available.
    async fn ensure_bytes(&mut self, n: usize) -> std::io::Result<()> {
        if self.buffer.capacity() < n {
            self.buffer.reserve(n - self.buffer.len());
        }
        while self.buffer.len() < n {
            let bytes_read = self.reader.read_buf(&mut self.buffer).await?;
            if bytes_read == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("expected {} bytes, got {}", n, self.buffer.len()),
                ));
            }
        }
        Ok(())
    }

    /// Read a single byte (u8).
    ///
    /// # Errors
    ///
    /// Returns an error if EOF is reached or an I/O error occurs.
    pub async fn read_u8(&mut self) -> std::io::Result<u8> {
        self.ensure_bytes(1).await?;
        Ok(self.buffer.get_u8())
    }

    /// Read a 32-bit unsigned integer in network byte order (big-endian).
    ///
    /// # Errors
    ///
    /// Returns an error if EOF is reached or an I/O error occurs.
    pub async fn read_u32(&mut self) -> std::io::Result<u32> {
        self.ensure_bytes(4).await?;
        Ok(self.buffer.get_u32())
    }

    /// Read a 32-bit signed integer in network byte order (big-endian).
    pub async fn read_i32(&mut self) -> std::io::Result<i32> {
        self.ensure_bytes(4).await?;
        Ok(self.buffer.get_i32())
    }

    /// Read exactly `len` bytes and return them as an immutable payload.
    ///
    /// The returned [`Bytes`] shares the stream's allocation where possible,
    /// so frames can be cached and re-sent without copying.
    ///
    /// # Errors
    ///
    /// Returns an error if EOF is reached before `len` bytes arrive.
    pub async fn read_payload(&mut self, len: usize) -> std::io::Result<Bytes> {
        self.ensure_bytes(len).await?;
        Ok(self.buffer.split_to(len).freeze())
    }

    /// Read one newline-terminated line.
    ///
    /// The trailing `\n` (and a preceding `\r`, if any) is stripped. Returns
    /// `Ok(None)` on a clean end of stream. A final line without a newline is
    /// returned as-is before `None`.
    ///
    /// A line longer than `max_len` is discarded up to and including its
    /// newline, and reported as [`std::io::ErrorKind::InvalidData`]; the
    /// stream stays usable.
    pub async fn read_line(&mut self, max_len: usize) -> std::io::Result<Option<String>> {
        let mut oversized = false;
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line = self.buffer.split_to(pos + 1);
                if oversized || pos > max_len {
                    return Err(line_too_long(max_len));
                }
                return decode_line(&line[..pos]).map(Some);
            }

            if self.buffer.len() > max_len {
                self.buffer.clear();
                oversized = true;
            }

            let bytes_read = self.reader.read_buf(&mut self.buffer).await?;
            if bytes_read == 0 {
                if oversized {
                    return Err(line_too_long(max_len));
                }
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let line = self.buffer.split();
                if line.len() > max_len {
                    return Err(line_too_long(max_len));
                }
                return decode_line(&line).map(Some);
            }
        }
    }

    /// Wait until at least one byte is buffered.
    ///
    /// Returns the number of buffered bytes, or 0 if the peer closed the
    /// stream with nothing left to read. Safe to cancel: bytes that arrive
    /// before cancellation stay buffered.
    pub async fn wait_for_data(&mut self) -> std::io::Result<usize> {
        if self.buffer.is_empty() {
            self.reader.read_buf(&mut self.buffer).await?;
        }
        Ok(self.buffer.len())
    }

    /// Get the number of bytes currently available in the buffer.
    ///
    /// This indicates how many bytes can be read without performing I/O.
    pub fn available(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(raw: &[u8]) -> std::io::Result<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8(raw.to_vec()).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("request line is not UTF-8: {}", e),
        )
    })
}

fn line_too_long(max_len: usize) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("request line exceeds {} bytes", max_len),
    )
}

/// Buffered output stream for writing protocol data.
///
/// Data is buffered internally and only written when
/// [`flush()`](Self::flush) is called.
///
/// # Important: Flushing
///
/// You **must** call [`flush()`](Self::flush) to ensure buffered data is
/// actually sent over the network. Dropping the stream without flushing
/// will lose any buffered data.
pub struct FrameOutStream<W> {
    writer: W,
    buffer: BytesMut,
}

impl<W: AsyncWrite + Unpin> FrameOutStream<W> {
    /// Create a new output stream with default buffer size (8KB).
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, 8192)
    }

    /// Create a new output stream with specified buffer capacity.
    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        Self {
            writer,
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Write a single byte (u8).
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    /// Write a 32-bit unsigned integer in network byte order (big-endian).
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.put_u32(value);
    }

    /// Write a 32-bit signed integer in network byte order (big-endian).
    pub fn write_i32(&mut self, value: i32) {
        self.buffer.put_i32(value);
    }

    /// Write a byte slice to the buffer.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Write `line` followed by a single `\n`.
    pub fn write_line(&mut self, line: &str) {
        self.buffer.extend_from_slice(line.as_bytes());
        self.buffer.put_u8(b'\n');
    }

    /// Flush all buffered data to the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or if the underlying writer's
    /// `flush()` method returns an error.
    pub async fn flush(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer).await?;
            self.buffer.clear();
        }
        self.writer.flush().await
    }

    /// Flush, then shut down the write side of the underlying writer.
    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.flush().await?;
        self.writer.shutdown().await
    }

    /// Get the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_read_u32() {
        let data = vec![0x12, 0x34, 0x56, 0x78];
        let mut stream = FrameInStream::new(Cursor::new(data));

        assert_eq!(stream.read_u32().await.unwrap(), 0x12345678);
    }

    #[tokio::test]
    async fn test_read_i32() {
        let data = vec![0xFF, 0xFF, 0xFF, 0xFE]; // -2 in two's complement
        let mut stream = FrameInStream::new(Cursor::new(data));

        assert_eq!(stream.read_i32().await.unwrap(), -2);
    }

    #[tokio::test]
    async fn test_read_payload() {
        let data = vec![1, 2, 3, 4, 5];
        let mut stream = FrameInStream::new(Cursor::new(data));

        assert_eq!(&stream.read_payload(3).await.unwrap()[..], &[1, 2, 3]);
        assert_eq!(&stream.read_payload(2).await.unwrap()[..], &[4, 5]);
    }

    #[tokio::test]
    async fn test_read_payload_larger_than_buffer() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let mut stream = FrameInStream::with_capacity(Cursor::new(data.clone()), 16);

        let payload = stream.read_payload(data.len()).await.unwrap();
        assert_eq!(&payload[..], &data[..]);
    }

    #[tokio::test]
    async fn test_read_eof() {
        let data = vec![1, 2];
        let mut stream = FrameInStream::new(Cursor::new(data));

        let result = stream.read_u32().await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_read_lines() {
        let data = b"PING\nmarc 7\r\nDISCONNECT".to_vec();
        let mut stream = FrameInStream::new(Cursor::new(data));

        assert_eq!(stream.read_line(64).await.unwrap().as_deref(), Some("PING"));
        assert_eq!(stream.read_line(64).await.unwrap().as_deref(), Some("marc 7"));
        assert_eq!(
            stream.read_line(64).await.unwrap().as_deref(),
            Some("DISCONNECT")
        );
        assert_eq!(stream.read_line(64).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_line_oversized_is_skipped() {
        let mut data = vec![b'x'; 100];
        data.extend_from_slice(b"\nPING\n");
        let mut stream = FrameInStream::with_capacity(Cursor::new(data), 8);

        let err = stream.read_line(16).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        assert_eq!(stream.read_line(16).await.unwrap().as_deref(), Some("PING"));
    }

    #[tokio::test]
    async fn test_read_line_oversized_in_one_read() {
        let mut data = vec![b'a'; 5000];
        data.extend_from_slice(b" 1\nPING\n");
        let mut stream = FrameInStream::with_capacity(Cursor::new(data), 16 * 1024);

        let err = stream.read_line(MAX_LINE_LEN).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        assert_eq!(
            stream.read_line(MAX_LINE_LEN).await.unwrap().as_deref(),
            Some("PING")
        );
    }

    #[tokio::test]
    async fn test_read_line_limit_is_inclusive() {
        let mut data = vec![b'y'; 16];
        data.push(b'\n');
        data.extend_from_slice(&[b'z'; 17]);
        let mut stream = FrameInStream::new(Cursor::new(data));

        assert_eq!(stream.read_line(16).await.unwrap().map(|l| l.len()), Some(16));
        // Unterminated trailing line over the limit.
        let err = stream.read_line(16).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_read_line_rejects_invalid_utf8() {
        let data = vec![0xFF, 0xFE, b'\n'];
        let mut stream = FrameInStream::new(Cursor::new(data));

        let err = stream.read_line(64).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_wait_for_data_keeps_bytes() {
        let mut stream = FrameInStream::new(Cursor::new(vec![0, 0, 0, 9]));
        assert_eq!(stream.wait_for_data().await.unwrap(), 4);
        assert_eq!(stream.read_u32().await.unwrap(), 9);
        assert_eq!(stream.wait_for_data().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wait_for_data_times_out_without_input() {
        let (_client, server) = tokio::io::duplex(64);
        let mut stream = FrameInStream::new(server);
        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(20), stream.wait_for_data())
                .await;
        assert!(waited.is_err());
        assert_eq!(stream.available(), 0);
    }

    #[tokio::test]
    async fn test_write_primitives() {
        let mut buffer = Vec::new();
        let mut stream = FrameOutStream::new(&mut buffer);

        stream.write_u32(0x12345678);
        stream.write_i32(-2);
        stream.write_u8(1);
        assert_eq!(stream.buffered(), 9);
        stream.flush().await.unwrap();
        assert_eq!(stream.buffered(), 0);

        assert_eq!(
            buffer,
            vec![0x12, 0x34, 0x56, 0x78, 0xFF, 0xFF, 0xFF, 0xFE, 0x01]
        );
    }

    #[tokio::test]
    async fn test_write_line() {
        let mut buffer = Vec::new();
        let mut stream = FrameOutStream::new(&mut buffer);

        stream.write_line("marc 0");
        stream.write_line("PING");
        stream.flush().await.unwrap();

        assert_eq!(buffer, b"marc 0\nPING\n");
    }

    #[tokio::test]
    async fn test_round_trip() {
        let mut buffer = Vec::new();

        {
            let mut out = FrameOutStream::new(&mut buffer);
            out.write_line("clip 3");
            out.write_u32(4);
            out.write_bytes(b"test");
            out.write_i32(448);
            out.flush().await.unwrap();
        }

        let mut inp = FrameInStream::new(Cursor::new(&buffer));
        assert_eq!(inp.read_line(64).await.unwrap().as_deref(), Some("clip 3"));
        assert_eq!(inp.read_u32().await.unwrap(), 4);
        assert_eq!(&inp.read_payload(4).await.unwrap()[..], b"test");
        assert_eq!(inp.read_i32().await.unwrap(), 448);
    }
}
