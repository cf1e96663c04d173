//! Heartbeat timeout policy and the interval-driven liveness sweep.
//!
//! Transport failures do not always surface as a clean disconnect, so a
//! background task periodically asks a [`SweepHandler`] to expire agents
//! whose heartbeat is too old.

use async_trait::async_trait;
use chrono::TimeDelta;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default heartbeat timeout applied when none is configured.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long an agent may stay silent before it is no longer eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessPolicy {
    heartbeat_timeout: TimeDelta,
}

impl LivenessPolicy {
    /// Creates a policy with the given heartbeat timeout.
    ///
    /// Durations too large for [`TimeDelta`] saturate to its maximum.
    #[must_use]
    pub fn new(heartbeat_timeout: Duration) -> Self {
        Self {
            heartbeat_timeout: TimeDelta::from_std(heartbeat_timeout).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Returns the heartbeat timeout.
    #[must_use]
    pub const fn heartbeat_timeout(&self) -> TimeDelta {
        self.heartbeat_timeout
    }
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_TIMEOUT)
    }
}

/// Work performed on every liveness-sweep tick.
#[async_trait]
pub trait SweepHandler: Send + Sync + 'static {
    /// Runs one sweep pass.
    async fn sweep(&self);
}

/// Spawns the background liveness sweep.
///
/// The first pass runs one full `period` after spawning. The task stops when
/// `shutdown` is cancelled; a pass already in progress finishes first.
pub fn spawn_liveness_sweep<H>(
    handler: Arc<H>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    H: SweepHandler,
{
    let period = period.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => handler.sweep().await,
            }
        }
        debug!("liveness sweep stopped");
    })
}
