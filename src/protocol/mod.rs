//! Dispatch protocol: wire messages, outbound events and the engine that
//! maps one to the other.
//!
//! Inbound frames are decoded at the transport boundary into the closed
//! [`messages::InboundMessage`] set, so malformed input fails fast with a
//! typed [`error::ValidationError`]. The [`engine::DispatchEngine`] performs
//! no I/O of its own: each handler returns the [`events::Delivery`] list the
//! [`router::Router`] then resolves against the connection registry.

pub mod engine;
pub mod error;
pub mod events;
pub mod messages;
pub mod router;

pub use engine::DispatchEngine;
pub use error::{DispatchError, DispatchResult, ErrorCode, ValidationError};
pub use events::{Delivery, OutboundEvent, Target};
pub use messages::InboundMessage;
pub use router::Router;

#[cfg(test)]
mod tests;
