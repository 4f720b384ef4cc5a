//! Frame streaming protocol implementation.
//!
//! This crate provides the wire layer shared by the origin frame server, the
//! caching relay and the viewer. It handles buffered stream I/O, request line
//! and frame response (de)serialization, and the AIMD congestion controllers
//! that ride on top of request/response round trips.
//!
//! # Modules
//!
//! - [`io`] - Buffered I/O streams (FrameInStream, FrameOutStream)
//! - [`messages`] - Request lines and frame responses
//! - [`congestion`] - Viewer-side and origin-side AIMD controllers
//! - [`errors`] - Codec error type
//!
//! # Examples
//!
//! ```no_run
//! use frame_protocol::{FrameInStream, FrameOutStream, FrameResponse, Leg, Request};
//!
//! # async fn example() -> Result<(), frame_protocol::ProtocolError> {
//! let socket = tokio::net::TcpStream::connect("localhost:5000").await?;
//! let (reader, writer) = socket.into_split();
//! let (mut input, mut output) = (FrameInStream::new(reader), FrameOutStream::new(writer));
//!
//! Request::frame("marc", 0).write_to(&mut output);
//! output.flush().await?;
//!
//! let frame = FrameResponse::read_from(&mut input, Leg::Origin).await?;
//! assert!(frame.verify());
//! # Ok(())
//! # }
//! ```

pub mod congestion;
pub mod errors;
pub mod io;
pub mod messages;

// Re-export commonly used types
pub use congestion::{OriginCongestion, OriginCongestionParams, ViewerCongestion};
pub use errors::ProtocolError;
pub use io::{FrameInStream, FrameOutStream};
pub use messages::{checksum, FrameResponse, Leg, Request};
