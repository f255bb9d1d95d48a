//! Subscriber registry implementation
//!
//! The central registry that owns the publisher slot and the subscriber set,
//! and fans relay frames out from the publisher to every subscriber.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot, Mutex, RwLock};

use super::config::{PublisherPolicy, RegistryConfig};
use super::entry::{PublisherSlot, RelayStats, SubscriberEntry};
use super::error::RegistryError;
use super::frame::RelayFrame;

/// Registry of the single publisher and all subscribers
///
/// Thread-safe via `RwLock`. Broadcasting only needs read access to take a
/// snapshot of the subscriber queues; connect and disconnect take the write
/// lock.
pub struct SubscriberRegistry {
    /// Subscriber entries keyed by session ID
    subscribers: RwLock<HashMap<u64, SubscriberEntry>>,

    /// Current publisher, if any
    publisher: Mutex<Option<PublisherSlot>>,

    frames_broadcast: AtomicU64,
    bytes_broadcast: AtomicU64,
    deliveries: AtomicU64,
    failed_deliveries: AtomicU64,

    /// Configuration
    config: RegistryConfig,
}

impl SubscriberRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            publisher: Mutex::new(None),
            frames_broadcast: AtomicU64::new(0),
            bytes_broadcast: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            failed_deliveries: AtomicU64::new(0),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Claim the publisher slot
    ///
    /// With [`PublisherPolicy::Replace`] an existing publisher is evicted: the
    /// receiver returned to it when it registered fires, and its task closes
    /// the connection. With [`PublisherPolicy::Reject`] the newcomer gets
    /// [`RegistryError::PublisherActive`].
    ///
    /// The returned receiver fires if this publisher is evicted later.
    pub async fn register_publisher(
        &self,
        session_id: u64,
        peer_addr: SocketAddr,
    ) -> Result<oneshot::Receiver<()>, RegistryError> {
        let mut slot = self.publisher.lock().await;

        if let Some(current) = slot.as_ref() {
            if self.config.publisher_policy == PublisherPolicy::Reject {
                tracing::warn!(
                    session_id = session_id,
                    current = current.session_id,
                    "Publisher rejected: slot occupied"
                );
                return Err(RegistryError::PublisherActive(current.session_id));
            }
        }

        let (new_slot, evict_rx) = PublisherSlot::new(session_id, peer_addr);

        if let Some(previous) = slot.replace(new_slot) {
            tracing::info!(
                session_id = session_id,
                evicted = previous.session_id,
                "Publisher replaced"
            );
            previous.evict();
        } else {
            tracing::info!(session_id = session_id, peer = %peer_addr, "Publisher registered");
        }

        Ok(evict_rx)
    }

    /// Release the publisher slot
    ///
    /// Only clears the slot if `session_id` still owns it; an evicted
    /// publisher cleaning up after itself leaves its successor alone.
    pub async fn unregister_publisher(&self, session_id: u64) -> Result<(), RegistryError> {
        let mut slot = self.publisher.lock().await;
        let owner = slot.as_ref().map(|s| s.session_id);

        if owner == Some(session_id) {
            slot.take();
            tracing::info!(session_id = session_id, "Publisher unregistered");
            return Ok(());
        }

        tracing::debug!(
            session_id = session_id,
            owner = ?owner,
            "Publisher unregister skipped: not the owner"
        );
        Err(RegistryError::PublisherMismatch { owner, session_id })
    }

    /// Add a subscriber
    ///
    /// Returns the queue on which every subsequent broadcast frame arrives.
    pub async fn register(
        &self,
        session_id: u64,
        peer_addr: SocketAddr,
    ) -> mpsc::UnboundedReceiver<RelayFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.write().await;

        subscribers.insert(session_id, SubscriberEntry::new(session_id, peer_addr, tx));

        tracing::info!(
            session_id = session_id,
            peer = %peer_addr,
            subscribers = subscribers.len(),
            "Subscriber added"
        );

        rx
    }

    /// Record the request string a subscriber sent after connecting
    ///
    /// Only the first one is kept. Returns `true` if it was recorded.
    pub async fn record_request(&self, session_id: u64, request: &str) -> bool {
        let mut subscribers = self.subscribers.write().await;

        match subscribers.get_mut(&session_id) {
            Some(entry) if entry.request.is_none() => {
                entry.request = Some(request.to_string());
                true
            }
            _ => false,
        }
    }

    /// Request string recorded for a subscriber
    pub async fn request_of(&self, session_id: u64) -> Option<String> {
        let subscribers = self.subscribers.read().await;
        subscribers.get(&session_id).and_then(|e| e.request.clone())
    }

    /// Remove a subscriber; removing an unknown one is a no-op
    pub async fn unregister(&self, session_id: u64) {
        let mut subscribers = self.subscribers.write().await;

        if subscribers.remove(&session_id).is_some() {
            tracing::info!(
                session_id = session_id,
                subscribers = subscribers.len(),
                "Subscriber removed"
            );
        }
    }

    /// Queue a frame for every current subscriber
    ///
    /// Membership is snapshotted first, so subscribers leaving mid-broadcast
    /// neither block nor fail the call. A subscriber whose queue is closed is
    /// skipped; its own connection task unregisters it. Returns the number of
    /// subscribers the frame was queued for.
    pub async fn broadcast(&self, frame: RelayFrame) -> usize {
        let targets: Vec<(u64, mpsc::UnboundedSender<RelayFrame>)> = {
            let subscribers = self.subscribers.read().await;
            subscribers
                .values()
                .map(|e| (e.id, e.tx.clone()))
                .collect()
        };

        self.frames_broadcast.fetch_add(1, Ordering::Relaxed);
        self.bytes_broadcast
            .fetch_add(frame.len() as u64, Ordering::Relaxed);

        let mut delivered = 0;
        for (id, tx) in targets {
            if tx.send(frame.clone()).is_ok() {
                delivered += 1;
            } else {
                self.failed_deliveries.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(session_id = id, "Subscriber queue closed, frame skipped");
            }
        }

        self.deliveries
            .fetch_add(delivered as u64, Ordering::Relaxed);

        delivered
    }

    /// Number of registered subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Check if a subscriber is registered
    pub async fn is_registered(&self, session_id: u64) -> bool {
        self.subscribers.read().await.contains_key(&session_id)
    }

    /// Session ID of the current publisher
    pub async fn publisher_id(&self) -> Option<u64> {
        self.publisher.lock().await.as_ref().map(|s| s.session_id)
    }

    /// Get registry statistics
    pub async fn stats(&self) -> RelayStats {
        RelayStats {
            subscriber_count: self.subscriber_count().await,
            publisher_id: self.publisher_id().await,
            frames_broadcast: self.frames_broadcast.load(Ordering::Relaxed),
            bytes_broadcast: self.bytes_broadcast.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            failed_deliveries: self.failed_deliveries.load(Ordering::Relaxed),
        }
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    fn frame(payload: &[u8]) -> RelayFrame {
        RelayFrame::new(b"Content-Type: audio/pcm\r\n\r\n", payload)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all() {
        let registry = SubscriberRegistry::new();
        let mut rx1 = registry.register(1, peer(1)).await;
        let mut rx2 = registry.register(2, peer(2)).await;

        let sent = frame(&[1, 2, 3, 4]);
        assert_eq!(registry.broadcast(sent.clone()).await, 2);

        assert_eq!(rx1.recv().await.unwrap(), sent);
        assert_eq!(rx2.recv().await.unwrap(), sent);
    }

    #[tokio::test]
    async fn test_unregistered_subscriber_excluded() {
        let registry = SubscriberRegistry::new();
        let mut receivers = Vec::new();
        for id in 1..=3 {
            receivers.push(registry.register(id, peer(id as u16)).await);
        }

        registry.unregister(2).await;
        assert_eq!(registry.broadcast(frame(&[9])).await, 2);

        assert!(receivers[0].try_recv().is_ok());
        // queue of an unregistered subscriber is closed and empty
        assert!(receivers[1].recv().await.is_none());
        assert!(receivers[2].try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_unregister_idempotent() {
        let registry = SubscriberRegistry::new();
        let _rx = registry.register(1, peer(1)).await;

        registry.unregister(1).await;
        registry.unregister(1).await;
        registry.unregister(42).await;

        assert_eq!(registry.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_block_others() {
        let registry = SubscriberRegistry::new();
        let rx1 = registry.register(1, peer(1)).await;
        let mut rx2 = registry.register(2, peer(2)).await;

        // connection task died without unregistering yet
        drop(rx1);

        assert_eq!(registry.broadcast(frame(&[7])).await, 1);
        assert!(rx2.try_recv().is_ok());

        let stats = registry.stats().await;
        assert_eq!(stats.failed_deliveries, 1);
        assert_eq!(stats.deliveries, 1);
        assert_eq!(stats.subscriber_count, 2);
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers() {
        let registry = SubscriberRegistry::new();
        assert_eq!(registry.broadcast(frame(&[0; 16])).await, 0);

        let stats = registry.stats().await;
        assert_eq!(stats.frames_broadcast, 1);
        assert_eq!(stats.bytes_broadcast, 43);
    }

    #[tokio::test]
    async fn test_request_recorded_once() {
        let registry = SubscriberRegistry::new();
        let _rx = registry.register(5, peer(5)).await;

        assert!(registry.record_request(5, "channel=100").await);
        assert!(!registry.record_request(5, "again").await);
        assert!(!registry.record_request(6, "unknown").await);

        assert_eq!(registry.request_of(5).await.as_deref(), Some("channel=100"));
    }

    #[tokio::test]
    async fn test_publisher_replace_evicts() {
        let registry = SubscriberRegistry::new();

        let evicted = registry.register_publisher(1, peer(1)).await.unwrap();
        let _current = registry.register_publisher(2, peer(2)).await.unwrap();

        assert!(evicted.await.is_ok());
        assert_eq!(registry.publisher_id().await, Some(2));

        // evicted session cleaning up must not clear its successor
        assert!(matches!(
            registry.unregister_publisher(1).await,
            Err(RegistryError::PublisherMismatch {
                owner: Some(2),
                session_id: 1
            })
        ));
        assert_eq!(registry.publisher_id().await, Some(2));

        registry.unregister_publisher(2).await.unwrap();
        assert!(!registry.stats().await.has_publisher());
    }

    #[tokio::test]
    async fn test_publisher_reject_policy() {
        let config = RegistryConfig::default().publisher_policy(PublisherPolicy::Reject);
        let registry = SubscriberRegistry::with_config(config);

        let _rx = registry.register_publisher(1, peer(1)).await.unwrap();
        let result = registry.register_publisher(2, peer(2)).await;

        assert!(matches!(result, Err(RegistryError::PublisherActive(1))));
        assert_eq!(registry.publisher_id().await, Some(1));
    }

    #[tokio::test]
    async fn test_publisher_and_subscribers_independent() {
        let registry = SubscriberRegistry::new();
        let _pub_rx = registry.register_publisher(1, peer(1)).await.unwrap();
        let _sub_rx = registry.register(2, peer(2)).await;

        registry.unregister_publisher(1).await.unwrap();
        assert!(registry.is_registered(2).await);

        let _pub_rx = registry.register_publisher(3, peer(3)).await.unwrap();
        registry.unregister(2).await;
        assert_eq!(registry.publisher_id().await, Some(3));
    }
}
