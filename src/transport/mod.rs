//! Network transports carrying the dispatch protocol.

pub mod websocket;

pub use websocket::serve;
