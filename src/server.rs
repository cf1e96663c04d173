//! Hub assembly and lifecycle.
//!
//! [`DispatchHub`] wires the connection registry, agent directory, task
//! lifecycle service and router into one engine, then runs the liveness
//! sweep and the WebSocket listener until shutdown is requested.

use crate::agent::{
    adapters::memory::InMemoryAgentRepository,
    ports::AgentRepository,
    services::{AgentDirectory, LivenessPolicy, SweepHandler, spawn_liveness_sweep},
};
use crate::config::{ConfigError, HubConfig};
use crate::protocol::{DispatchEngine, Router};
use crate::session::services::{ConnectionRegistry, DEFAULT_OUTBOX_CAPACITY};
use crate::task::{
    adapters::memory::InMemoryTaskRepository, ports::TaskRepository,
    services::TaskLifecycleService,
};
use crate::transport;
use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Errors that stop the hub from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not bind its address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address that failed to bind.
        address: SocketAddr,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A hub backed by in-memory stores and the system clock.
pub type InMemoryHub = DispatchHub<InMemoryAgentRepository, InMemoryTaskRepository, DefaultClock>;

/// The assembled dispatch hub.
pub struct DispatchHub<A, T, C>
where
    A: AgentRepository,
    T: TaskRepository,
    C: Clock + Send + Sync,
{
    engine: Arc<DispatchEngine<A, T, C>>,
    router: Router,
    outbox_capacity: usize,
}

impl<A, T, C> DispatchHub<A, T, C>
where
    A: AgentRepository + 'static,
    T: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Assembles a hub over the given stores and clock.
    #[must_use]
    pub fn new(agents: Arc<A>, tasks: Arc<T>, clock: Arc<C>, policy: LivenessPolicy) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let directory = Arc::new(AgentDirectory::new(agents, Arc::clone(&clock), policy));
        let lifecycle = TaskLifecycleService::new(tasks, Arc::clone(&clock));
        let engine = Arc::new(DispatchEngine::new(
            Arc::clone(&registry),
            directory,
            lifecycle,
            clock,
        ));
        Self {
            engine,
            router: Router::new(registry),
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }

    /// Sets how many frames each connection may have queued before further
    /// frames to it are dropped. Zero is raised to one.
    #[must_use]
    pub fn with_outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity.max(1);
        self
    }

    /// Returns the dispatch engine.
    #[must_use]
    pub const fn engine(&self) -> &Arc<DispatchEngine<A, T, C>> {
        &self.engine
    }

    /// Returns the outbound router.
    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }

    /// Runs one liveness pass and routes its events.
    pub async fn sweep_once(&self) {
        self.router.deliver(self.engine.sweep().await);
    }

    /// Starts the periodic liveness sweep.
    pub fn spawn_sweep(&self, period: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let pass = Arc::new(LivenessPass {
            engine: Arc::clone(&self.engine),
            router: self.router.clone(),
        });
        spawn_liveness_sweep(pass, period, shutdown)
    }

    /// Serves WebSocket connections on `listener` until `shutdown` fires.
    pub async fn serve(&self, listener: TcpListener, shutdown: CancellationToken) {
        self.listen(listener, self.outbox_capacity, shutdown).await;
    }

    async fn listen(
        &self,
        listener: TcpListener,
        outbox_capacity: usize,
        shutdown: CancellationToken,
    ) {
        transport::serve(
            listener,
            Arc::clone(&self.engine),
            self.router.clone(),
            outbox_capacity,
            shutdown,
        )
        .await;
    }

    /// Binds the configured address and runs the sweep and listener until
    /// `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the configuration is invalid or the
    /// address cannot be bound.
    pub async fn run(
        &self,
        config: &HubConfig,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        config.validate()?;
        let address = config.socket_addr()?;
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind { address, source })?;
        info!(
            %address,
            heartbeat_timeout_secs = config.heartbeat_timeout_secs,
            sweep_interval_secs = config.sweep_interval_secs,
            outbox_capacity = config.outbox_capacity,
            "dispatch hub starting"
        );

        let sweep = self.spawn_sweep(config.sweep_interval(), shutdown.clone());
        self.listen(listener, config.outbox_capacity, shutdown).await;
        if let Err(err) = sweep.await {
            warn!(error = %err, "liveness sweep task ended abnormally");
        }
        info!("dispatch hub stopped");
        Ok(())
    }
}

impl InMemoryHub {
    /// Assembles a hub over fresh in-memory stores and the system clock.
    #[must_use]
    pub fn in_memory(policy: LivenessPolicy) -> Self {
        Self::new(
            Arc::new(InMemoryAgentRepository::new()),
            Arc::new(InMemoryTaskRepository::new()),
            Arc::new(DefaultClock),
            policy,
        )
    }
}

struct LivenessPass<A, T, C>
where
    A: AgentRepository,
    T: TaskRepository,
    C: Clock + Send + Sync,
{
    engine: Arc<DispatchEngine<A, T, C>>,
    router: Router,
}

#[async_trait]
impl<A, T, C> SweepHandler for LivenessPass<A, T, C>
where
    A: AgentRepository + 'static,
    T: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    async fn sweep(&self) {
        self.router.deliver(self.engine.sweep().await);
    }
}
