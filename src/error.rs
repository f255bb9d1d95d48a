//! Error types for the relay

use std::fmt;
use std::io;

use tokio_tungstenite::tungstenite;

use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket or listener I/O failure
    Io(io::Error),
    /// WebSocket handshake or framing failure
    WebSocket(tungstenite::Error),
    /// Violation of the relay's textual/binary protocol
    Protocol(ProtocolError),
    /// Publisher slot conflict
    Registry(RegistryError),
}

/// Protocol-level errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload length differs from the declared `Content-Length`
    LengthMismatch { declared: usize, actual: usize },
    /// `Content-Length` present but not a number
    InvalidContentLength(String),
    /// `X-Audio-Format` missing or unusable
    InvalidAudioFormat(String),
    /// Message arrived that the current state cannot accept
    UnexpectedMessage(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::WebSocket(e) => write!(f, "WebSocket error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::LengthMismatch { declared, actual } => write!(
                f,
                "payload length {} does not match Content-Length {}",
                actual, declared
            ),
            ProtocolError::InvalidContentLength(v) => write!(f, "invalid Content-Length: {}", v),
            ProtocolError::InvalidAudioFormat(v) => write!(f, "invalid X-Audio-Format: {}", v),
            ProtocolError::UnexpectedMessage(m) => write!(f, "unexpected message: {}", m),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::WebSocket(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Registry(e) => Some(e),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<tungstenite::Error> for Error {
    fn from(e: tungstenite::Error) -> Self {
        Error::WebSocket(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}
