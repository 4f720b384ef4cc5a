//! Protocol message types.
//!
//! Two messages travel on every link:
//!
//! - **Requests** ([`request`]) - newline-terminated text commands, sent by
//!   the viewer to the relay and by the relay to the origin
//! - **Frame responses** ([`response`]) - binary, length-prefixed frames with
//!   an additive checksum, sent back down the same links
//!
//! # Wire Format Rules
//!
//! 1. **Big-endian byte order** - length and checksum are network byte order
//! 2. **Strict boolean validation** - the provenance byte must be exactly 0 or 1
//! 3. **Leg-dependent shape** - only relay -> viewer frames carry the provenance byte
//! 4. **Fail-fast errors** - a short frame is an error, never a partial payload
//!
//! # Examples
//!
//! ```
//! use frame_protocol::messages::{FrameResponse, Request};
//!
//! let request = Request::parse("marc 7").unwrap();
//! assert_eq!(request.to_string(), "marc 7");
//!
//! let response = FrameResponse::new(bytes::Bytes::from_static(b"\x01\x02\x03"));
//! assert_eq!(response.checksum, 6);
//! ```

pub mod request;
pub mod response;

#[cfg(test)]
mod proptest_framing;

pub use request::Request;
pub use response::{checksum, FrameResponse, Leg, MAX_FRAME_LEN};
