//! Caching relay between frame viewers and an origin frame server.
//!
//! The relay accepts any number of viewer connections and keeps exactly one
//! connection to the origin. Frame requests are answered from a per-video
//! LRU cache when possible; misses go to the origin over the shared link, are
//! cached, and are forwarded with a provenance flag telling the viewer where
//! the frame came from.
//!
//! # Quick Start
//!
//! ```no_run
//! use frame_relay::{Config, RelayServer};
//!
//! # async fn example() -> Result<(), frame_relay::RelayError> {
//! let config = Config::builder()
//!     .origin_host("localhost")
//!     .origin_port(5000)
//!     .build()?;
//!
//! let server = RelayServer::start(config).await?;
//! println!("clients connect to {}", server.local_addr()?);
//! server.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Accept loop** ([`server`]): one task per client connection
//! - **Sessions** ([`session`]): read a request, serve it, reply, repeat
//! - **Origin link** ([`origin`]): one exchange at a time behind an async mutex
//! - **Cache** (`frame-cache`): shared registry with one lock per video
//!
//! # Error Handling
//!
//! A failure on a client connection ends only that client's session. A
//! failure on the origin link breaks the link for everyone: cached frames
//! are still served, misses get no reply. The link is not re-established.

#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod origin;
pub mod server;
pub mod session;
pub mod stats;
pub mod trace;
pub mod transport;

#[cfg(feature = "cli")]
pub mod args;

pub use config::Config;
pub use errors::RelayError;
pub use origin::{LinkSettings, OriginLink};
pub use server::RelayServer;
pub use session::{ClientSession, CloseReason, SessionContext, SessionState, SessionSummary};
pub use stats::{SessionStats, VideoStats};
