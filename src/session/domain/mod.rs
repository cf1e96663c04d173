//! Domain model for transport sessions and their bound identities.

mod error;
mod identity;
mod ids;
mod session;

pub use error::RegistryError;
pub use identity::{Identity, SessionRole};
pub use ids::SessionId;
pub use session::Session;
