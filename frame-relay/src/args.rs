//! Command-line arguments for the relay binary.
//!
//! This module is only available when the `cli` feature is enabled.

use crate::config::{Config, ConfigBuilder};
use crate::errors::RelayError;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Caching frame relay.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Origin frame server (host or host:port, default port 5000).
    ///
    /// Prompted for on stdin when neither this nor the config file sets it.
    #[arg(value_name = "ORIGIN", env = "FRAME_RELAY_ORIGIN")]
    pub origin: Option<String>,

    /// Address to accept clients on
    #[arg(short = 'l', long, value_name = "HOST")]
    pub listen: Option<String>,

    /// Port to accept clients on (0 = ephemeral)
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Frames cached per video
    #[arg(long, value_name = "FRAMES")]
    pub capacity: Option<usize>,

    /// Configuration file path (TOML format)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Parse command-line arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse arguments from an iterator.
    pub fn try_parse_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }
}

impl Config {
    /// Build a configuration from command-line arguments, prompting on stdin
    /// for the origin address if nothing provides one.
    pub fn from_args(args: Args) -> Result<Self, RelayError> {
        Self::from_args_with_prompt(args, || prompt_line("Enter origin server address: "))
    }

    /// Like [`Config::from_args`] with a custom source for the origin address.
    pub fn from_args_with_prompt<F>(args: Args, prompt: F) -> Result<Self, RelayError>
    where
        F: FnOnce() -> io::Result<String>,
    {
        let base = match &args.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        let mut builder = ConfigBuilder::from_config(base.clone());

        let origin = match args.origin {
            Some(origin) => Some(origin),
            None if base.origin.host.is_empty() => Some(prompt().map_err(|e| {
                RelayError::Config(format!("Failed to read origin address: {}", e))
            })?),
            None => None,
        };
        if let Some(origin) = origin {
            let (host, port) = parse_origin_address(&origin, base.origin.port)?;
            builder = builder.origin_host(host).origin_port(port);
        }

        if let Some(listen) = args.listen {
            builder = builder.listen_host(listen);
        }
        if let Some(port) = args.port {
            builder = builder.listen_port(port);
        }
        if let Some(capacity) = args.capacity {
            builder = builder.cache_capacity(capacity);
        }

        builder.build()
    }
}

/// Parse `host` or `host:port`.
fn parse_origin_address(addr: &str, default_port: u16) -> Result<(String, u16), RelayError> {
    let addr = addr.trim();
    match addr.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| RelayError::Config(format!("Invalid origin port: {}", port)))?;
            Ok((host.to_string(), port))
        }
        None => Ok((addr.to_string(), default_port)),
    }
}

fn prompt_line(prompt: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", prompt)?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
