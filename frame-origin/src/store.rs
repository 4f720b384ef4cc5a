//! Where the origin's frames come from.
//!
//! A [`FrameStore`] exposes, per video name, an ordered, zero-indexed
//! sequence of encoded frames. Stores are synchronous; the server calls
//! [`FrameStore::load`] on the blocking pool.

use crate::errors::StoreError;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File extension of extracted frames.
pub const FRAME_EXTENSION: &str = "jpg";

/// Read access to per-video frame sequences.
pub trait FrameStore: Send + Sync {
    /// Number of frames of `video`, or `None` if the video is unknown.
    fn frame_count(&self, video: &str) -> Option<usize>;

    /// Encoded bytes of frame `index` of `video`.
    fn load(&self, video: &str, index: u32) -> Result<Bytes, StoreError>;

    /// Known video names, sorted.
    fn videos(&self) -> Vec<String>;

    /// Check that `index` exists, returning the video's frame count.
    fn check(&self, video: &str, index: u32) -> Result<usize, StoreError> {
        let count = self
            .frame_count(video)
            .ok_or_else(|| StoreError::UnknownVideo(video.to_string()))?;
        if index as usize >= count {
            return Err(StoreError::OutOfRangeFrame {
                video: video.to_string(),
                index,
                count,
            });
        }
        Ok(count)
    }
}

/// Frames stored as files: `<root>/<video>/*.jpg`.
///
/// The file list is captured once by [`DirectoryFrameStore::scan`]; frame
/// `i` is the `i`-th file in file-name order. Frame bytes are read from disk
/// on every load.
#[derive(Debug, Default)]
pub struct DirectoryFrameStore {
    root: PathBuf,
    videos: BTreeMap<String, Vec<PathBuf>>,
}

impl DirectoryFrameStore {
    /// Index every video directory under `root`.
    ///
    /// A missing root yields an empty store. Directories without frames are
    /// skipped.
    pub fn scan(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut videos = BTreeMap::new();

        if !root.exists() {
            warn!("Frame directory {} does not exist", root.display());
            return Ok(Self { root, videos });
        }

        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("Skipping non UTF-8 directory {:?}", entry.path());
                continue;
            };
            let frames = list_frames(&entry.path())?;
            if frames.is_empty() {
                debug!("No frames in {}", entry.path().display());
                continue;
            }
            info!("Indexed {} frames for {}", frames.len(), name);
            videos.insert(name, frames);
        }

        Ok(Self { root, videos })
    }

    /// Directory the store was scanned from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of one frame file.
    pub fn frame_path(&self, video: &str, index: u32) -> Option<&Path> {
        self.videos
            .get(video)
            .and_then(|frames| frames.get(index as usize))
            .map(PathBuf::as_path)
    }
}

/// Frame files of one video directory, sorted by file name.
pub fn list_frames(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(FRAME_EXTENSION)
        })
        .collect();
    frames.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(frames)
}

impl FrameStore for DirectoryFrameStore {
    fn frame_count(&self, video: &str) -> Option<usize> {
        self.videos.get(video).map(Vec::len)
    }

    fn load(&self, video: &str, index: u32) -> Result<Bytes, StoreError> {
        self.check(video, index)?;
        let path = self
            .frame_path(video, index)
            .ok_or_else(|| StoreError::UnknownVideo(video.to_string()))?;
        fs::read(path).map(Bytes::from).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn videos(&self) -> Vec<String> {
        self.videos.keys().cloned().collect()
    }
}

/// Frames held in memory.
#[derive(Debug, Default)]
pub struct MemoryFrameStore {
    videos: RwLock<BTreeMap<String, Vec<Bytes>>>,
}

impl MemoryFrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a video.
    pub fn insert<I>(&self, video: impl Into<String>, frames: I)
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        let frames = frames.into_iter().map(Into::into).collect();
        self.videos.write().insert(video.into(), frames);
    }

    /// Builder-style [`MemoryFrameStore::insert`].
    #[must_use]
    pub fn with_video<I>(self, video: impl Into<String>, frames: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        self.insert(video, frames);
        self
    }
}

impl FrameStore for MemoryFrameStore {
    fn frame_count(&self, video: &str) -> Option<usize> {
        self.videos.read().get(video).map(Vec::len)
    }

    fn load(&self, video: &str, index: u32) -> Result<Bytes, StoreError> {
        self.check(video, index)?;
        self.videos
            .read()
            .get(video)
            .and_then(|frames| frames.get(index as usize).cloned())
            .ok_or_else(|| StoreError::UnknownVideo(video.to_string()))
    }

    fn videos(&self) -> Vec<String> {
        self.videos.read().keys().cloned().collect()
    }
}
