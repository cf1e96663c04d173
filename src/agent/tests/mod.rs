//! Unit tests for the agent directory module.
