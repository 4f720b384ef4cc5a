//! Command-line arguments for the origin binary.

use crate::config::Config;
use clap::Parser;
use std::io;
use std::path::PathBuf;

/// Origin frame server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Port to listen on
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Directory of source videos
    #[arg(long, value_name = "DIR")]
    pub videos: Option<PathBuf>,

    /// Directory of extracted frames
    #[arg(long, value_name = "DIR")]
    pub frames: Option<PathBuf>,

    /// Do not run ffmpeg; serve whatever frames already exist
    #[arg(long)]
    pub no_extract: bool,

    /// Configuration file path (TOML format)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn try_parse_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }
}

impl Config {
    /// Config file (if any) overridden by explicit flags.
    pub fn from_args(args: &Args) -> io::Result<Self> {
        let mut config = match &args.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(port) = args.port {
            config.listen.port = port;
        }
        if let Some(videos) = &args.videos {
            config.media.videos_dir = videos.clone();
        }
        if let Some(frames) = &args.frames {
            config.media.frames_dir = frames.clone();
        }
        if args.no_extract {
            config.media.extract = false;
        }
        config
            .validate()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        Ok(config)
    }
}
