//! Statistics and metrics for relay connections

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Connection-level statistics
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// When the connection was accepted
    pub started_at: Instant,
    /// Messages received from the peer
    pub messages_received: u64,
    /// Payload bytes received from the peer
    pub bytes_received: u64,
    /// Messages sent to the peer
    pub messages_sent: u64,
    /// Payload bytes sent to the peer
    pub bytes_sent: u64,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            messages_received: 0,
            bytes_received: 0,
            messages_sent: 0,
            bytes_sent: 0,
        }
    }

    /// Count one received message
    pub fn on_receive(&mut self, len: usize) {
        self.messages_received += 1;
        self.bytes_received += len as u64;
    }

    /// Count one sent message
    pub fn on_send(&mut self, len: usize) {
        self.messages_sent += 1;
        self.bytes_sent += len as u64;
    }

    /// Get duration since the connection was accepted
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Inbound bitrate in bits per second over a given duration
    pub fn bitrate_over(&self, duration: Duration) -> u64 {
        let secs = duration.as_secs();
        if secs > 0 {
            (self.bytes_received * 8) / secs
        } else {
            0
        }
    }
}

/// Server-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Total connections ever accepted
    pub total_connections: u64,
    /// Current active connections
    pub active_connections: u64,
    /// Connections refused: limit reached, origin rejected, failed or timed-out
    /// upgrade, or a publisher turned away by the reject policy
    pub rejected_connections: u64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Live connection counters shared between the listener and connection tasks
#[derive(Debug, Default)]
pub struct ServerCounters {
    total: AtomicU64,
    active: AtomicU64,
    rejected: AtomicU64,
}

impl ServerCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection was accepted and its task spawned
    pub fn opened(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    /// A connection task finished
    pub fn closed(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    /// A connection was refused
    pub fn rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServerStats {
        ServerStats {
            total_connections: self.total.load(Ordering::Relaxed),
            active_connections: self.active.load(Ordering::Relaxed),
            rejected_connections: self.rejected.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_stats_new() {
        let stats = SessionStats::new();
        assert_eq!(stats.messages_received, 0);
        assert_eq!(stats.bytes_received, 0);
        assert_eq!(stats.messages_sent, 0);
        assert_eq!(stats.bytes_sent, 0);
    }

    #[test]
    fn test_session_stats_counting() {
        let mut stats = SessionStats::new();
        stats.on_receive(8192);
        stats.on_receive(120);
        stats.on_send(8312);

        assert_eq!(stats.messages_received, 2);
        assert_eq!(stats.bytes_received, 8312);
        assert_eq!(stats.messages_sent, 1);
        assert_eq!(stats.bytes_sent, 8312);
    }

    #[test]
    fn test_bitrate_over() {
        let mut stats = SessionStats::new();
        stats.bytes_received = 1_000_000;

        // 1,000,000 bytes * 8 bits / 10 seconds = 800,000 bps
        assert_eq!(stats.bitrate_over(Duration::from_secs(10)), 800_000);
        assert_eq!(stats.bitrate_over(Duration::ZERO), 0);
    }

    #[test]
    fn test_server_counters() {
        let counters = ServerCounters::new();
        counters.opened();
        counters.opened();
        counters.closed();
        counters.rejected();

        assert_eq!(
            counters.snapshot(),
            ServerStats {
                total_connections: 2,
                active_connections: 1,
                rejected_connections: 1,
            }
        );
    }

    #[test]
    fn test_server_stats_new() {
        let stats = ServerStats::new();
        assert_eq!(stats.total_connections, 0);
        assert_eq!(stats.active_connections, 0);
        assert_eq!(stats.rejected_connections, 0);
    }
}
