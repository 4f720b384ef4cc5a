//! Configuration types for the origin server.

use crate::extract::ExtractOptions;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Complete origin configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Where videos and frames live, and how frames are extracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Source videos (`*.mp4`, `*.avi`).
    #[serde(default = "default_videos_dir")]
    pub videos_dir: PathBuf,
    /// One sub-directory of JPEG frames per video.
    #[serde(default = "default_frames_dir")]
    pub frames_dir: PathBuf,
    /// Run `ffmpeg` for videos without frames at startup.
    #[serde(default = "default_true")]
    pub extract: bool,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_quality")]
    pub quality: u32,
}

fn default_videos_dir() -> PathBuf {
    PathBuf::from("Videos")
}

fn default_frames_dir() -> PathBuf {
    PathBuf::from("Video Frames")
}

fn default_true() -> bool {
    true
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_fps() -> u32 {
    30
}

fn default_quality() -> u32 {
    2
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            videos_dir: default_videos_dir(),
            frames_dir: default_frames_dir(),
            extract: default_true(),
            ffmpeg: default_ffmpeg(),
            fps: default_fps(),
            quality: default_quality(),
        }
    }
}

impl MediaConfig {
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            ffmpeg: self.ffmpeg.clone(),
            fps: self.fps,
            quality: self.quality,
        }
    }
}

impl Config {
    /// Load a configuration from a TOML file. Missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to parse config file '{}': {}", path.display(), e),
            )
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen.host.is_empty() {
            return Err("Listen host cannot be empty".to_string());
        }
        if self.media.fps == 0 {
            return Err("Extraction fps cannot be 0".to_string());
        }
        Ok(())
    }

    /// `host:port` the listener binds.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen.host, self.listen.port)
    }
}
