//! Application services for session bookkeeping.

mod registry;

pub use registry::{
    BindOutcome, ConnectionRegistry, DEFAULT_OUTBOX_CAPACITY, Outbox, RegistryResult, Unbound,
};
