//! Connection context
//!
//! Identity and role of one accepted connection, filled in from the
//! WebSocket upgrade request.

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

/// Role of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    /// The audio producer
    Publisher,
    /// A receiver of broadcast frames
    Subscriber,
    /// Not classified (echo mode, or before the upgrade completes)
    Unclassified,
}

impl ConnectionRole {
    /// Classify a request path
    ///
    /// A path containing `marker` selects the subscriber role; any other path
    /// is a publisher.
    pub fn classify(path: &str, marker: &str) -> Self {
        if path.contains(marker) {
            ConnectionRole::Subscriber
        } else {
            ConnectionRole::Publisher
        }
    }
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionRole::Publisher => "publisher",
            ConnectionRole::Subscriber => "subscriber",
            ConnectionRole::Unclassified => "unclassified",
        };
        f.write_str(s)
    }
}

/// Information about one connection
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Unique session ID
    pub session_id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Request path of the upgrade (including query)
    pub path: String,

    /// `Origin` header of the upgrade, if sent
    pub origin: Option<String>,

    /// Assigned role
    pub role: ConnectionRole,

    /// When the connection was accepted
    pub accepted_at: Instant,
}

impl ConnectionContext {
    /// Create a context for a freshly accepted connection
    pub fn new(session_id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            session_id,
            peer_addr,
            path: String::new(),
            origin: None,
            role: ConnectionRole::Unclassified,
            accepted_at: Instant::now(),
        }
    }

    /// Record the upgrade request
    pub fn with_request(mut self, path: impl Into<String>, origin: Option<String>) -> Self {
        self.path = path.into();
        self.origin = origin;
        self
    }

    /// Assign the role from the request path
    pub fn classify(&mut self, marker: &str) -> ConnectionRole {
        self.role = ConnectionRole::classify(&self.path, marker);
        self.role
    }
}
