//! Unit tests for the dispatch protocol.

mod support;
