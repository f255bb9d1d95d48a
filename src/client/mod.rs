//! Relay clients
//!
//! Rust counterparts of the capturing and playing browser pages:
//! - [`RelayPublisher`]: sends PCM chunks with their headers
//! - [`RelaySubscriber`]: receives relay frames and splits them again

pub mod config;
pub mod publisher;
pub mod subscriber;

pub use config::ClientConfig;
pub use publisher::RelayPublisher;
pub use subscriber::RelaySubscriber;
