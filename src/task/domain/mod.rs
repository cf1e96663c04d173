//! Domain model for dispatched tasks.
//!
//! The task domain models the request payload, the assigned agent, and the
//! guarded `pending → assigned → {completed, failed}` state machine while
//! keeping all infrastructure concerns outside of the domain boundary.

mod error;
mod ids;
mod payload;
mod task;

pub use error::{ParseTaskStatusError, TaskDomainError};
pub use ids::{CallerId, TaskId};
pub use payload::TaskPayload;
pub use task::{NewTask, PersistedTaskData, Task, TaskCompletion, TaskOutcome, TaskStatus};
