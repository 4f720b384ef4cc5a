//! Origin frame server.
//!
//! Serves pre-extracted video frames to the relay over the origin leg of the
//! frame protocol. At startup, videos without frames are run through
//! `ffmpeg`, then the frames directory is indexed into a
//! [`DirectoryFrameStore`].

#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod extract;
pub mod server;
pub mod store;

#[cfg(feature = "cli")]
pub mod args;

pub use config::Config;
pub use errors::StoreError;
pub use server::OriginServer;
pub use store::{DirectoryFrameStore, FrameStore, MemoryFrameStore};

use std::io;
use tracing::info;

/// Extract missing frames (if enabled) and index the frames directory.
pub async fn prepare_store(media: &config::MediaConfig) -> io::Result<DirectoryFrameStore> {
    if media.extract {
        let report =
            extract::prepare_videos(&media.videos_dir, &media.frames_dir, &media.extract_options())
                .await?;
        info!(
            "Extraction: {} extracted, {} skipped, {} failed",
            report.extracted.len(),
            report.skipped.len(),
            report.failed.len()
        );
    }

    let frames_dir = media.frames_dir.clone();
    tokio::task::spawn_blocking(move || DirectoryFrameStore::scan(frames_dir))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}
