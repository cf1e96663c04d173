//! Adapter implementations for the agent repository port.

pub mod memory;
