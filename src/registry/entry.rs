//! Registry entries and statistics

use std::net::SocketAddr;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};

use super::frame::RelayFrame;

/// A connected subscriber
pub struct SubscriberEntry {
    /// Session ID of the subscriber connection
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Request string sent right after connecting, if any
    pub request: Option<String>,

    /// When the subscriber registered
    pub connected_at: Instant,

    /// Frame queue drained by the subscriber's connection task
    pub(super) tx: mpsc::UnboundedSender<RelayFrame>,
}

impl SubscriberEntry {
    pub(super) fn new(
        id: u64,
        peer_addr: SocketAddr,
        tx: mpsc::UnboundedSender<RelayFrame>,
    ) -> Self {
        Self {
            id,
            peer_addr,
            request: None,
            connected_at: Instant::now(),
            tx,
        }
    }
}

/// The single publisher slot
pub struct PublisherSlot {
    /// Session ID of the current publisher
    pub session_id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// When the publisher took the slot
    pub claimed_at: Instant,

    /// Fired when the publisher is evicted by a newcomer
    pub(super) evict_tx: oneshot::Sender<()>,
}

impl PublisherSlot {
    pub(super) fn new(session_id: u64, peer_addr: SocketAddr) -> (Self, oneshot::Receiver<()>) {
        let (evict_tx, evict_rx) = oneshot::channel();
        let slot = Self {
            session_id,
            peer_addr,
            claimed_at: Instant::now(),
            evict_tx,
        };
        (slot, evict_rx)
    }

    /// Signal the owning connection to close
    pub(super) fn evict(self) {
        // Receiver is gone if the publisher task already finished
        let _ = self.evict_tx.send(());
    }
}

/// Snapshot of registry-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Number of registered subscribers
    pub subscriber_count: usize,
    /// Session ID of the current publisher
    pub publisher_id: Option<u64>,
    /// Frames handed to the registry by publishers
    pub frames_broadcast: u64,
    /// Bytes handed to the registry by publishers
    pub bytes_broadcast: u64,
    /// Frames queued to subscribers (one per subscriber per frame)
    pub deliveries: u64,
    /// Frames that could not be queued because the subscriber was gone
    pub failed_deliveries: u64,
}

impl RelayStats {
    /// Check if a publisher is connected
    pub fn has_publisher(&self) -> bool {
        self.publisher_id.is_some()
    }
}
