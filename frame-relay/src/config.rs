//! Configuration types for the relay.

use crate::errors::RelayError;
use frame_protocol::OriginCongestionParams;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete relay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Client-facing listener.
    #[serde(default)]
    pub listen: ListenConfig,
    /// Origin frame server link.
    #[serde(default)]
    pub origin: OriginConfig,
    /// Frame cache.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Per-client session behaviour.
    #[serde(default)]
    pub session: SessionConfig,
    /// Origin link congestion controller.
    #[serde(default)]
    pub congestion: CongestionConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    /// Address to bind.
    #[serde(default = "default_listen_host")]
    pub host: String,
    /// Port to bind (0 picks an ephemeral port).
    #[serde(default)]
    pub port: u16,
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_listen_host(),
            port: 0,
        }
    }
}

/// Origin link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Origin hostname or IP address.
    #[serde(default)]
    pub host: String,
    /// Origin port.
    #[serde(default = "default_origin_port")]
    pub port: u16,
    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// How long to wait for the first byte of a reply, in milliseconds.
    ///
    /// Keep this above the origin's slowest frame load: a reply arriving
    /// later can be taken for the answer to the next request.
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
    /// Once a reply has started, how long the whole frame may take, in
    /// milliseconds.
    #[serde(default = "default_frame_timeout_ms")]
    pub frame_timeout_ms: u64,
}

fn default_origin_port() -> u16 {
    5000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_reply_timeout_ms() -> u64 {
    2_000
}

fn default_frame_timeout_ms() -> u64 {
    10_000
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_origin_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reply_timeout_ms: default_reply_timeout_ms(),
            frame_timeout_ms: default_frame_timeout_ms(),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Frames kept per video.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    frame_cache::DEFAULT_CAPACITY
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity timeout in milliseconds; clients ping to stay alive.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Emit a statistics report every this many cache lookups.
    #[serde(default = "default_stats_interval")]
    pub stats_interval: u64,
}

fn default_idle_timeout_ms() -> u64 {
    10_000
}

fn default_stats_interval() -> u64 {
    50
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: default_idle_timeout_ms(),
            stats_interval: default_stats_interval(),
        }
    }
}

/// Origin link congestion controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CongestionConfig {
    #[serde(default = "default_initial_window")]
    pub initial_window: f64,
    #[serde(default = "default_initial_threshold")]
    pub initial_threshold: f64,
    #[serde(default = "default_additive_increase")]
    pub additive_increase: f64,
    #[serde(default = "default_multiplicative_decrease")]
    pub multiplicative_decrease: f64,
    #[serde(default = "default_floor_threshold")]
    pub floor_threshold: f64,
    #[serde(default = "default_max_window")]
    pub max_window: f64,
    /// Smoothed RTT before the first sample, in milliseconds.
    #[serde(default = "default_initial_rtt_ms")]
    pub initial_rtt_ms: u64,
}

fn default_initial_window() -> f64 {
    OriginCongestionParams::default().initial_window
}

fn default_initial_threshold() -> f64 {
    OriginCongestionParams::default().initial_threshold
}

fn default_additive_increase() -> f64 {
    OriginCongestionParams::default().additive_increase
}

fn default_multiplicative_decrease() -> f64 {
    OriginCongestionParams::default().multiplicative_decrease
}

fn default_floor_threshold() -> f64 {
    OriginCongestionParams::default().floor_threshold
}

fn default_max_window() -> f64 {
    OriginCongestionParams::default().max_window
}

fn default_initial_rtt_ms() -> u64 {
    50
}

impl Default for CongestionConfig {
    fn default() -> Self {
        Self {
            initial_window: default_initial_window(),
            initial_threshold: default_initial_threshold(),
            additive_increase: default_additive_increase(),
            multiplicative_decrease: default_multiplicative_decrease(),
            floor_threshold: default_floor_threshold(),
            max_window: default_max_window(),
            initial_rtt_ms: default_initial_rtt_ms(),
        }
    }
}

impl CongestionConfig {
    /// Controller parameters described by this section.
    #[must_use]
    pub fn params(&self) -> OriginCongestionParams {
        OriginCongestionParams {
            initial_window: self.initial_window,
            initial_threshold: self.initial_threshold,
            additive_increase: self.additive_increase,
            multiplicative_decrease: self.multiplicative_decrease,
            floor_threshold: self.floor_threshold,
            max_window: self.max_window,
            initial_rtt: Duration::from_millis(self.initial_rtt_ms),
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a configuration from a TOML file. Missing fields take defaults.
    ///
    /// The result is not validated; the origin host may still be missing.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&text).map_err(|e| {
            RelayError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.listen.host.is_empty() {
            return Err(RelayError::Config("Listen host cannot be empty".to_string()));
        }

        if self.origin.host.is_empty() {
            return Err(RelayError::Config("Origin host cannot be empty".to_string()));
        }

        if self.origin.port == 0 {
            return Err(RelayError::Config("Origin port cannot be 0".to_string()));
        }

        if self.origin.connect_timeout_ms == 0
            || self.origin.reply_timeout_ms == 0
            || self.origin.frame_timeout_ms == 0
        {
            return Err(RelayError::Config(
                "Origin timeouts must be greater than 0".to_string(),
            ));
        }

        if self.cache.capacity == 0 {
            return Err(RelayError::Config("Cache capacity cannot be 0".to_string()));
        }

        if self.session.idle_timeout_ms == 0 {
            return Err(RelayError::Config(
                "Session idle timeout must be greater than 0".to_string(),
            ));
        }

        if self.session.stats_interval == 0 {
            return Err(RelayError::Config(
                "Statistics interval cannot be 0".to_string(),
            ));
        }

        self.congestion
            .params()
            .validate()
            .map_err(|e| RelayError::Config(format!("Invalid congestion settings: {}", e)))
    }

    /// `host:port` the listener binds.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen.host, self.listen.port)
    }

    /// Origin connection timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.origin.connect_timeout_ms)
    }

    /// Origin reply timeout.
    #[must_use]
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.origin.reply_timeout_ms)
    }

    /// Bound on reading one whole origin frame.
    #[must_use]
    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.origin.frame_timeout_ms)
    }

    /// Client inactivity timeout.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.session.idle_timeout_ms)
    }
}

/// Builder for creating a `Config`.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from an existing configuration.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Sets the listener bind address.
    #[must_use]
    pub fn listen_host(mut self, host: impl Into<String>) -> Self {
        self.config.listen.host = host.into();
        self
    }

    /// Sets the listener port.
    #[must_use]
    pub fn listen_port(mut self, port: u16) -> Self {
        self.config.listen.port = port;
        self
    }

    /// Sets the origin hostname or IP address.
    #[must_use]
    pub fn origin_host(mut self, host: impl Into<String>) -> Self {
        self.config.origin.host = host.into();
        self
    }

    /// Sets the origin port.
    #[must_use]
    pub fn origin_port(mut self, port: u16) -> Self {
        self.config.origin.port = port;
        self
    }

    /// Sets the origin reply timeout.
    #[must_use]
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.config.origin.reply_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Sets the per-video cache capacity.
    #[must_use]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache.capacity = capacity;
        self
    }

    /// Sets the client inactivity timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.session.idle_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Sets how many lookups pass between statistics reports.
    #[must_use]
    pub fn stats_interval(mut self, interval: u64) -> Self {
        self.config.session.stats_interval = interval;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Config, RelayError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
