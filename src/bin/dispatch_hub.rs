//! Runs the dispatch hub as a standalone WebSocket server.
//!
//! Usage:
//!
//! ```text
//! dispatch_hub [--config hub.toml] [--bind 0.0.0.0:8765] [--log-format json]
//! ```
//!
//! Settings load from the optional TOML file first; flags override them.
//! Ctrl-C stops the listener and the liveness sweep, then exits.

use clap::Parser;
use dispatch_hub::config::{ConfigError, HubConfig};
use dispatch_hub::observability::{LogFormat, LoggingError, init_logging};
use dispatch_hub::server::{InMemoryHub, ServerError};
use std::path::PathBuf;
use thiserror::Error;
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while starting or running the hub.
#[derive(Debug, Error)]
enum HubError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("logging setup failed: {0}")]
    Logging(#[from] LoggingError),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] ServerError),
}

/// Real-time dispatch hub pairing task callers with task-capable agents.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "DISPATCH_HUB_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, for example `0.0.0.0:8765`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Seconds an agent may stay silent before it is ineligible.
    #[arg(long)]
    heartbeat_timeout_secs: Option<u64>,

    /// Seconds between liveness sweeps.
    #[arg(long)]
    sweep_interval_secs: Option<u64>,

    /// Outbound frames a connection may have queued before further frames
    /// to it are dropped.
    #[arg(long)]
    outbox_capacity: Option<usize>,

    /// Default log filter; `RUST_LOG` takes precedence.
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn into_config(self) -> Result<HubConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => HubConfig::load(path)?,
            None => HubConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(secs) = self.heartbeat_timeout_secs {
            config.heartbeat_timeout_secs = secs;
        }
        if let Some(secs) = self.sweep_interval_secs {
            config.sweep_interval_secs = secs;
        }
        if let Some(capacity) = self.outbox_capacity {
            config.outbox_capacity = capacity;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), BoxError> {
    run(Cli::parse()).map_err(Into::into)
}

fn run(cli: Cli) -> Result<(), HubError> {
    let config = cli.into_config()?;
    init_logging(&config.logging.level, config.logging.format)?;

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(HubError::RuntimeInit)?;
    runtime.block_on(serve(config))
}

async fn serve(config: HubConfig) -> Result<(), HubError> {
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(err) => error!(error = %err, "failed to listen for ctrl-c; shutting down"),
        }
        signal_token.cancel();
    });

    let hub = InMemoryHub::in_memory(config.liveness_policy());
    hub.run(&config, shutdown).await?;
    Ok(())
}
