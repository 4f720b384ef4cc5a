//! Command-line arguments for the viewer binary.

use crate::config::{Config, ConfigBuilder};
use crate::errors::ViewerError;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Headless frame viewer.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Relay address as host:port. Prompted for when omitted.
    #[arg(value_name = "RELAY", env = "FRAME_VIEWER_RELAY")]
    pub relay: Option<String>,

    /// Write received frames under this directory
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Accept frames without decoding them as images
    #[arg(long)]
    pub no_validate: bool,

    /// Re-requests allowed per frame
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

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
    /// Build a configuration from arguments, prompting on stdin for the relay
    /// address when neither the arguments nor the config file give one.
    pub fn from_args(args: Args) -> Result<Self, ViewerError> {
        Self::from_args_with_prompt(args, |question| prompt_line(question))
    }

    /// Like [`Config::from_args`] with a custom prompt.
    pub fn from_args_with_prompt<F>(args: Args, mut prompt: F) -> Result<Self, ViewerError>
    where
        F: FnMut(&str) -> io::Result<String>,
    {
        let base = match &args.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        let needs_prompt = base.relay.host.is_empty() || base.relay.port == 0;
        let mut builder = ConfigBuilder::from_config(base);

        let prompt_err = |e: io::Error| ViewerError::Config(format!("Failed to read input: {}", e));
        match args.relay {
            Some(relay) => {
                let (host, port) = parse_relay_address(&relay)?;
                builder = builder.host(host).port(port);
            }
            None if needs_prompt => {
                let host = prompt("Enter relay IP address: ").map_err(prompt_err)?;
                let port = prompt("Enter relay port: ").map_err(prompt_err)?;
                let port = port
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| ViewerError::Config(format!("Invalid relay port: {}", port)))?;
                builder = builder.host(host.trim()).port(port);
            }
            None => {}
        }

        if let Some(dir) = args.output {
            builder = builder.output_dir(dir);
        }
        if args.no_validate {
            builder = builder.validate_images(false);
        }
        if let Some(retries) = args.max_retries {
            builder = builder.max_retries(retries);
        }
        builder.build()
    }
}

fn parse_relay_address(addr: &str) -> Result<(String, u16), ViewerError> {
    let (host, port) = addr
        .trim()
        .rsplit_once(':')
        .ok_or_else(|| ViewerError::Config(format!("Relay address needs a port: {}", addr)))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| ViewerError::Config(format!("Invalid relay port: {}", port)))?;
    Ok((host.to_string(), port))
}

fn prompt_line(question: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", question)?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
