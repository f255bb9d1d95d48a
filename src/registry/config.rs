//! Registry configuration

/// What happens when a publisher connects while another one is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublisherPolicy {
    /// Evict the current publisher and install the new one
    #[default]
    Replace,
    /// Refuse the newcomer, keep the current publisher
    Reject,
}

/// Configuration for the subscriber registry
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Single publisher slot policy
    pub publisher_policy: PublisherPolicy,
}

impl RegistryConfig {
    /// Set the publisher slot policy
    pub fn publisher_policy(mut self, policy: PublisherPolicy) -> Self {
        self.publisher_policy = policy;
        self
    }
}
