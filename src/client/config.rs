//! Client configuration

use crate::protocol::constants::{DEFAULT_BOUNDARY, DEFAULT_USER_AGENT};

/// Settings for a relay publisher
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the relay (e.g., "ws://localhost:9001/")
    pub url: String,

    /// `channel` id announced in the preamble
    pub channel: String,

    /// `source` id announced in the preamble
    pub source: String,

    /// `User-Agent` announced in the preamble
    pub user_agent: String,

    /// Multipart boundary between chunks
    pub boundary: String,
}

impl ClientConfig {
    /// Create a config for the given relay URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            channel: "100".to_string(),
            source: "1".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            boundary: DEFAULT_BOUNDARY.to_string(),
        }
    }

    /// Set the channel and source ids
    pub fn ids(mut self, channel: impl Into<String>, source: impl Into<String>) -> Self {
        self.channel = channel.into();
        self.source = source.into();
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }
}
