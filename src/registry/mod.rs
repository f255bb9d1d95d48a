//! Publisher slot and subscriber fan-out
//!
//! The registry holds at most one publisher and any number of subscribers.
//! Each subscriber owns an unbounded queue; broadcasting clones the frame's
//! `Bytes` handle into every queue, so all subscribers share one allocation.
//!
//! ```text
//!                       Arc<SubscriberRegistry>
//!                  ┌──────────────────────────────┐
//!                  │ publisher: Option<Slot>      │
//!                  │ subscribers: HashMap<id,     │
//!                  │   SubscriberEntry { tx }     │
//!                  │ >                            │
//!                  └──────────────┬───────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Publisher]            [Subscriber]            [Subscriber]
//!    session.on_binary()    rx.recv()               rx.recv()
//!         │                       │                       │
//!         └──► registry.broadcast() ──► ws.send(Binary) ──► TCP
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod frame;
pub mod store;

pub use config::{PublisherPolicy, RegistryConfig};
pub use entry::{PublisherSlot, RelayStats, SubscriberEntry};
pub use error::RegistryError;
pub use frame::{ParsedFrame, RelayFrame};
pub use store::SubscriberRegistry;
