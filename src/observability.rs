//! Structured logging setup.
//!
//! Logs go through `tracing` with an [`EnvFilter`]. The configured level is
//! the default filter, and `RUST_LOG`, when set, replaces it entirely.
//! Output is one of three formats:
//!
//! - `json` for log aggregation
//! - `pretty` for local development
//! - `compact` for terminals

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt as layer_fmt, prelude::*};

/// Log output format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line, human-readable output.
    Pretty,
    /// Single-line terminal output.
    #[default]
    Compact,
}

impl LogFormat {
    /// Returns the canonical configuration value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The level is not a valid filter directive.
    #[error("invalid log filter '{filter}': {source}")]
    InvalidFilter {
        /// Rejected directive.
        filter: String,
        /// Parser error.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    /// A global subscriber is already installed.
    #[error("logging already initialised: {0}")]
    AlreadyInitialised(#[from] tracing_subscriber::util::TryInitError),
}

/// Builds the event filter for `level`, letting `RUST_LOG` take precedence.
///
/// # Errors
///
/// Returns [`LoggingError::InvalidFilter`] when `level` (or `RUST_LOG`) is
/// not a valid directive.
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    let directives = std::env::var("RUST_LOG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| level.to_owned());
    EnvFilter::try_new(&directives).map_err(|source| LoggingError::InvalidFilter {
        filter: directives,
        source,
    })
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`LoggingError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), LoggingError> {
    let filter = build_filter(level)?;
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(layer_fmt::layer().json().with_current_span(true))
            .try_init()?,
        LogFormat::Pretty => registry.with(layer_fmt::layer().pretty()).try_init()?,
        LogFormat::Compact => registry
            .with(layer_fmt::layer().compact().with_target(false))
            .try_init()?,
    }
    Ok(())
}
