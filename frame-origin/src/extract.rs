//! Frame extraction with `ffmpeg`.
//!
//! Each `*.mp4` / `*.avi` file in the videos directory becomes a directory of
//! numbered JPEG frames named after the video (file name up to its first
//! dot). Videos whose frame directory already exists are skipped.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{error, info, warn};

/// Video file extensions that are extracted (case-insensitive).
pub const VIDEO_EXTENSIONS: [&str; 2] = ["mp4", "avi"];

/// How to run `ffmpeg`.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Program to run.
    pub ffmpeg: PathBuf,
    /// Frames per second sampled from the video.
    pub fps: u32,
    /// JPEG quality scale passed as `-q:v` (2 is near-lossless).
    pub quality: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            fps: 30,
            quality: 2,
        }
    }
}

impl ExtractOptions {
    /// Arguments for extracting `video` into `out_dir`.
    pub fn args(&self, video: &Path, out_dir: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            video.display().to_string(),
            "-vf".to_string(),
            format!("fps={}", self.fps),
            "-q:v".to_string(),
            self.quality.to_string(),
            out_dir.join("frame_%04d.jpg").display().to_string(),
        ]
    }
}

/// Outcome of [`prepare_videos`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub extracted: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Video name for a file: its file name up to the first dot.
pub fn video_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.split('.').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Video files directly inside `dir`, sorted by path.
pub fn find_videos(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut videos: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| VIDEO_EXTENSIONS.iter().any(|v| e.eq_ignore_ascii_case(v)))
                    .unwrap_or(false)
        })
        .collect();
    videos.sort();
    Ok(videos)
}

/// Extract frames for every video in `videos_dir` that has no directory under
/// `frames_dir` yet.
///
/// A failed extraction removes its partial output so the next run retries.
pub async fn prepare_videos(
    videos_dir: &Path,
    frames_dir: &Path,
    options: &ExtractOptions,
) -> io::Result<ExtractReport> {
    let mut report = ExtractReport::default();
    if !videos_dir.exists() {
        warn!("Videos directory {} not found", videos_dir.display());
        return Ok(report);
    }

    let videos = find_videos(videos_dir)?;
    if videos.is_empty() {
        warn!("No video files found in {}", videos_dir.display());
    }

    for video in videos {
        let Some(name) = video_name(&video) else {
            warn!("Cannot derive a video name from {}", video.display());
            continue;
        };
        let out_dir = frames_dir.join(&name);
        if out_dir.exists() {
            info!("Frames for {} already exist, skipping extraction", name);
            report.skipped.push(name);
            continue;
        }

        tokio::fs::create_dir_all(&out_dir).await?;
        info!("Extracting frames for {}", video.display());
        match extract_frames(&video, &out_dir, options).await {
            Ok(()) => report.extracted.push(name),
            Err(e) => {
                error!("Frame extraction failed for {}: {}", video.display(), e);
                if let Err(e) = tokio::fs::remove_dir_all(&out_dir).await {
                    warn!("Could not remove {}: {}", out_dir.display(), e);
                }
                report.failed.push(name);
            }
        }
    }
    Ok(report)
}

/// Run `ffmpeg` for one video, logging its output line by line.
pub async fn extract_frames(video: &Path, out_dir: &Path, options: &ExtractOptions) -> io::Result<()> {
    let mut child = Command::new(&options.ffmpeg)
        .args(options.args(video, out_dir))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child.stdout.take().map(|s| tokio::spawn(log_lines(s)));
    let stderr = child.stderr.take().map(|s| tokio::spawn(log_lines(s)));

    let status = child.wait().await?;
    for task in [stdout, stderr].into_iter().flatten() {
        let _ = task.await;
    }

    if status.success() {
        info!("Frame extraction completed for {}", video.display());
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} exited with {}", options.ffmpeg.display(), status),
        ))
    }
}

async fn log_lines<R: AsyncRead + Unpin>(reader: R) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        info!(target: "ffmpeg", "{}", line);
    }
}
