//! Configuration types for the viewer.

use crate::errors::ViewerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete viewer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Relay connection settings.
    pub relay: RelayConfig,
    /// Playback settings.
    #[serde(default)]
    pub playback: PlaybackConfig,
}

/// Relay connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Relay hostname or IP address.
    pub host: String,
    /// Relay port (the relay picks an ephemeral one and logs it).
    pub port: u16,
    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Interval between `PING`s in milliseconds.
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_heartbeat_ms() -> u64 {
    5_000
}

/// Playback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// How long to wait for each frame, in milliseconds.
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
    /// Re-requests allowed per frame after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Re-request frames that do not decode as images.
    #[serde(default = "default_true")]
    pub validate_images: bool,
    /// Write each received frame to `<dir>/<video>/frame_NNNN.jpg`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Capacity of the event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_reply_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    16
}

fn default_true() -> bool {
    true
}

fn default_event_capacity() -> usize {
    64
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: default_reply_timeout_ms(),
            max_retries: default_max_retries(),
            validate_images: default_true(),
            output_dir: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay: RelayConfig {
                host: String::new(),
                port: 0,
                connect_timeout_ms: default_connect_timeout_ms(),
                heartbeat_ms: default_heartbeat_ms(),
            },
            playback: PlaybackConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ViewerError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ViewerError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&text).map_err(|e| {
            ViewerError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ViewerError> {
        if self.relay.host.is_empty() {
            return Err(ViewerError::Config("Relay host cannot be empty".to_string()));
        }
        if self.relay.port == 0 {
            return Err(ViewerError::Config("Relay port cannot be 0".to_string()));
        }
        if self.relay.heartbeat_ms == 0 {
            return Err(ViewerError::Config(
                "Heartbeat interval must be greater than 0".to_string(),
            ));
        }
        if self.playback.reply_timeout_ms == 0 {
            return Err(ViewerError::Config(
                "Reply timeout must be greater than 0".to_string(),
            ));
        }
        if self.playback.event_capacity == 0 {
            return Err(ViewerError::Config(
                "Event channel capacity cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.relay.connect_timeout_ms)
    }

    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.relay.heartbeat_ms)
    }

    #[must_use]
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.playback.reply_timeout_ms)
    }
}

/// Builder for creating a `Config`.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.relay.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.relay.port = port;
        self
    }

    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.relay.heartbeat_ms = interval.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.config.playback.reply_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.playback.max_retries = retries;
        self
    }

    #[must_use]
    pub fn validate_images(mut self, validate: bool) -> Self {
        self.config.playback.validate_images = validate;
        self
    }

    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.playback.output_dir = Some(dir.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<Config, ViewerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
