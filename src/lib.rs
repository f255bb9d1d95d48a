//! Live PCM audio relay over WebSocket
//!
//! One publisher connection streams raw PCM chunks, each announced by a small
//! textual header block. The relay glues every header to the binary chunk that
//! follows it and fans the resulting frame out to any number of subscribers.
//!
//! ```text
//!   publisher ──text header──► PublisherSession ──RelayFrame──► SubscriberRegistry
//!             ──binary PCM──►                                     │      │
//!                                                                 ▼      ▼
//!                                                          subscriber  subscriber
//! ```
//!
//! # Example
//! ```no_run
//! use pcm_relay::{RelayServer, ServerConfig};
//!
//! # async fn example() -> pcm_relay::error::Result<()> {
//! let config = ServerConfig::with_addr("127.0.0.1:9001".parse().unwrap());
//! let server = RelayServer::new(config);
//! server.run().await
//! # }
//! ```

pub mod client;
pub mod error;
pub mod media;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use protocol::{decode_header, encode_header, parse_audio_format_tag, HeaderBlock};
pub use registry::{RelayFrame, SubscriberRegistry};
pub use server::{RelayServer, ServerConfig, ServerMode};
pub use session::{ConnectionRole, PublisherSession};
