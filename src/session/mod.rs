//! Connection registry for live transport sessions.
//!
//! A session exists only while its transport connection is open. It gains an
//! identity lazily, when its first registration or request message binds it
//! as an agent or a caller. The [`services::ConnectionRegistry`] is the single
//! owner of that mapping: every other component reaches connectivity through
//! it by identifier and never caches session handles itself.

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
