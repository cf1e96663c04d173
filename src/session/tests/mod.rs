//! Unit tests for the connection registry.
