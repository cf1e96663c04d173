//! Deterministic test doubles shared by unit and integration tests.

use crate::agent::{
    adapters::memory::InMemoryAgentRepository,
    domain::{Agent, AgentId, AgentStatus, TaskType},
    ports::{AgentRepository, AgentRepositoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can keep one handle while the
/// services under test hold another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Creates a clock frozen at 2025-01-01T00:00:00Z.
    #[must_use]
    pub fn at_epoch() -> Self {
        Self::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default())
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock();
        *now += delta;
    }

    /// Moves the clock forward by whole seconds.
    pub fn advance_secs(&self, seconds: i64) {
        self.advance(TimeDelta::seconds(seconds));
    }

    /// Sets the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at_epoch()
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Agent repository write that [`GatedAgentRepository`] can hold open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatedWrite {
    /// [`AgentRepository::upsert`].
    Upsert,
    /// [`AgentRepository::set_status`].
    SetStatus,
}

/// Whether a gated write parks before or after it reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePoint {
    /// Park with the store still untouched.
    BeforeStore,
    /// Park once the write has landed.
    AfterStore,
}

/// In-memory agent repository that parks one chosen write until released.
///
/// Lets a test freeze a directory operation half way through and race
/// another one against it.
#[derive(Debug, Default)]
pub struct GatedAgentRepository {
    inner: InMemoryAgentRepository,
    armed: Mutex<Option<(GatedWrite, GatePoint)>>,
    held: Notify,
    release: Notify,
}

impl GatedAgentRepository {
    /// Creates an empty repository with no write armed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks the next `write` at `point`.
    pub fn hold_next(&self, write: GatedWrite, point: GatePoint) {
        *self.armed.lock() = Some((write, point));
    }

    /// Waits until the armed write is parked.
    pub async fn wait_until_held(&self) {
        self.held.notified().await;
    }

    /// Lets the parked write through.
    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self, write: GatedWrite, point: GatePoint) {
        let parked = {
            let mut armed = self.armed.lock();
            if *armed == Some((write, point)) {
                *armed = None;
                true
            } else {
                false
            }
        };
        if parked {
            self.held.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl AgentRepository for GatedAgentRepository {
    async fn upsert(&self, agent: &Agent) -> AgentRepositoryResult<()> {
        self.pass(GatedWrite::Upsert, GatePoint::BeforeStore).await;
        let stored = self.inner.upsert(agent).await;
        self.pass(GatedWrite::Upsert, GatePoint::AfterStore).await;
        stored
    }

    async fn find_by_id(&self, id: AgentId) -> AgentRepositoryResult<Option<Agent>> {
        self.inner.find_by_id(id).await
    }

    async fn set_status(
        &self,
        id: AgentId,
        status: AgentStatus,
        at: DateTime<Utc>,
    ) -> AgentRepositoryResult<Agent> {
        self.pass(GatedWrite::SetStatus, GatePoint::BeforeStore).await;
        let updated = self.inner.set_status(id, status, at).await;
        self.pass(GatedWrite::SetStatus, GatePoint::AfterStore).await;
        updated
    }

    async fn list_by_task_type(&self, task_type: &TaskType) -> AgentRepositoryResult<Vec<Agent>> {
        self.inner.list_by_task_type(task_type).await
    }

    async fn list_active(&self) -> AgentRepositoryResult<Vec<Agent>> {
        self.inner.list_active().await
    }
}
