//! Headless viewer for the frame relay.
//!
//! Connects to a relay, plays videos frame by frame with checksum
//! verification, retransmission and client-side congestion control, and
//! reports progress as [`ViewerEvent`]s on a bounded channel.
//!
//! # Quick Start
//!
//! ```no_run
//! use frame_viewer::{Config, Viewer, ViewerEvent};
//!
//! # async fn example() -> Result<(), frame_viewer::ViewerError> {
//! let config = Config::builder().host("localhost").port(40123).build()?;
//! let mut viewer = Viewer::connect(config).await?;
//!
//! let events = viewer.events();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv_async().await {
//!         if let ViewerEvent::FrameReceived { index, from_cache, .. } = event {
//!             println!("frame {} (cached: {})", index, from_cache);
//!         }
//!     }
//! });
//!
//! viewer.play("marc", 300).await?;
//! viewer.disconnect().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod client;
pub mod command;
pub mod config;
pub mod errors;
pub mod events;

#[cfg(feature = "cli")]
pub mod args;

pub use client::{PlaybackSummary, ReceivedFrame, Viewer};
pub use command::Command;
pub use config::Config;
pub use errors::ViewerError;
pub use events::{RetryReason, ViewerEvent};
