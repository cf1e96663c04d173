//! Identifier types for the task domain.

use crate::macros::uuid_identifier;

uuid_identifier!(
    /// Unique identifier for a dispatched task record.
    TaskId
);

uuid_identifier!(
    /// Identity of a caller requesting work.
    ///
    /// Callers present their own identifier with each request; it is used to
    /// route the eventual result back to whichever session the caller holds.
    CallerId
);
