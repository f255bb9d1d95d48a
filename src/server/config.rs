//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::protocol::constants::{DEFAULT_PORT, SUBSCRIBER_PATH_MARKER};

/// What the server does with accepted connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerMode {
    /// Classify by path and relay publisher frames to subscribers
    #[default]
    Relay,
    /// Send every message straight back to its sender
    Echo,
}

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Relay or echo
    pub mode: ServerMode,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Origins allowed to connect (None = any origin)
    pub allowed_origins: Option<Vec<String>>,

    /// Path substring that selects the subscriber role
    pub subscriber_path_marker: String,

    /// Largest WebSocket message accepted (None = tungstenite default)
    pub max_message_size: Option<usize>,

    /// The WebSocket upgrade must complete within this time
    pub handshake_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            mode: ServerMode::Relay,
            max_connections: 0, // Unlimited
            tcp_nodelay: true,  // Audio chunks are small and latency-sensitive
            allowed_origins: None,
            subscriber_path_marker: SUBSCRIBER_PATH_MARKER.to_string(),
            max_message_size: None,
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the server mode
    pub fn mode(mut self, mode: ServerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Allow an origin; once any origin is listed, unlisted ones are rejected
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins
            .get_or_insert_with(Vec::new)
            .push(origin.into());
        self
    }

    /// Set the subscriber path marker
    pub fn subscriber_path_marker(mut self, marker: impl Into<String>) -> Self {
        self.subscriber_path_marker = marker.into();
        self
    }

    /// Set the maximum WebSocket message size
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = Some(size);
        self
    }

    /// Set handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Check an upgrade request's `Origin` header against the allow list
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        match (&self.allowed_origins, origin) {
            (None, _) => true,
            (Some(allowed), Some(origin)) => allowed.iter().any(|a| a == origin),
            (Some(_), None) => false,
        }
    }
}
