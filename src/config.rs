//! Hub configuration.
//!
//! Settings come from an optional TOML file; every field has a default, so
//! an empty file (or none at all) yields a runnable local hub. Command-line
//! flags are applied on top by the binary.
//!
//! ```toml
//! bind_address = "0.0.0.0:8765"
//! heartbeat_timeout_secs = 30
//! sweep_interval_secs = 10
//! outbox_capacity = 256
//!
//! [logging]
//! level = "info,dispatch_hub=debug"
//! format = "json"
//! ```

use crate::agent::services::LivenessPolicy;
use crate::observability::LogFormat;
use crate::session::services::DEFAULT_OUTBOX_CAPACITY;
use serde::{Deserialize, Serialize};
use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default listen address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8765";
/// Default heartbeat timeout in seconds.
pub const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 30;
/// Default liveness sweep interval in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 10;
/// Default log filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that failed to load.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`HubConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The bind address is not a socket address.
    #[error("invalid bind address '{address}': {source}")]
    InvalidBindAddress {
        /// Rejected address.
        address: String,
        /// Parser error.
        #[source]
        source: AddrParseError,
    },

    /// A duration setting is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// The per-connection outbox holds no frames.
    #[error("outbox_capacity must be greater than zero")]
    ZeroOutboxCapacity,

    /// The log level is empty.
    #[error("log level must not be empty")]
    EmptyLogLevel,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_owned(),
            format: LogFormat::default(),
        }
    }
}

/// Top-level hub settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    /// Address the WebSocket listener binds.
    pub bind_address: String,
    /// Seconds an agent may stay silent before it is ineligible.
    pub heartbeat_timeout_secs: u64,
    /// Seconds between liveness sweeps.
    pub sweep_interval_secs: u64,
    /// Outbound frames a connection may have queued before further frames
    /// to it are dropped.
    pub outbox_capacity: usize,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_owned(),
            heartbeat_timeout_secs: DEFAULT_HEARTBEAT_TIMEOUT_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            logging: LoggingConfig::default(),
        }
    }
}

impl HubConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, or
    /// [`ConfigError::Parse`] when it is not valid configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Checks every setting.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        if self.heartbeat_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("heartbeat_timeout_secs"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::ZeroDuration("sweep_interval_secs"));
        }
        if self.outbox_capacity == 0 {
            return Err(ConfigError::ZeroOutboxCapacity);
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::EmptyLogLevel);
        }
        Ok(())
    }

    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] when the address does not
    /// parse.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_address
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddress {
                address: self.bind_address.clone(),
                source,
            })
    }

    /// Returns the heartbeat timeout.
    #[must_use]
    pub const fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// Returns the liveness sweep interval.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Returns the liveness policy derived from these settings.
    #[must_use]
    pub fn liveness_policy(&self) -> LivenessPolicy {
        LivenessPolicy::new(self.heartbeat_timeout())
    }
}
