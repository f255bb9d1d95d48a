//! Relay server
//!
//! Accepts TCP connections, upgrades them to WebSocket and hands each one to
//! its own task. In relay mode a connection whose path contains the
//! subscriber marker (`get` by default) becomes a subscriber; every other
//! connection is the publisher.

pub mod config;
pub mod connection;
pub mod listener;

pub use config::{ServerConfig, ServerMode};
pub use connection::Connection;
pub use listener::RelayServer;
