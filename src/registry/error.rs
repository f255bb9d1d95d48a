//! Registry error types

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The publisher slot is held by another session (reject policy)
    PublisherActive(u64),
    /// Session does not own the publisher slot
    PublisherMismatch { owner: Option<u64>, session_id: u64 },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::PublisherActive(id) => {
                write!(f, "Publisher slot held by session {}", id)
            }
            RegistryError::PublisherMismatch { owner, session_id } => write!(
                f,
                "Session {} does not own the publisher slot (owner: {:?})",
                session_id, owner
            ),
        }
    }
}

impl std::error::Error for RegistryError {}
