//! Per-connection state
//!
//! Each connection task owns its [`ConnectionContext`]; a publisher
//! connection additionally owns a [`PublisherSession`]. Nothing here is
//! shared between tasks.

pub mod context;
pub mod publisher;

pub use context::{ConnectionContext, ConnectionRole};
pub use publisher::{PublisherPhase, PublisherSession, TextOutcome};
