//! Publisher session state machine
//!
//! A publisher alternates text and binary messages: a header block, then the
//! PCM chunk it describes. The session pairs each binary message with the
//! most recent header and emits the concatenation as a [`RelayFrame`].
//!
//! ```text
//!   AwaitingHeader ──text──► AwaitingPayload ──binary──► emit frame
//!                                 ▲   │
//!                                 └───┘ text replaces the pending header,
//!                                       binary reuses it
//! ```

use bytes::Bytes;

use crate::protocol::{decode_header, Preamble};
use crate::registry::RelayFrame;

/// Phase of a publisher session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherPhase {
    /// No header received yet
    AwaitingHeader,
    /// A header is pending; every binary message becomes a frame
    AwaitingPayload,
}

/// How a text message was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOutcome {
    /// The message was a `POST` preamble and was discarded
    Preamble,
    /// The message was stored as the pending header
    Header,
}

/// Per-publisher state, owned by the publisher's connection task
#[derive(Debug)]
pub struct PublisherSession {
    /// Session ID of the publisher connection
    pub session_id: u64,

    phase: PublisherPhase,

    /// Last header text received, verbatim
    pending_header: Option<Bytes>,

    /// Whether `pending_header` has already been used for a frame
    header_used: bool,

    /// Parsed preamble, if one was sent
    preamble: Option<Preamble>,

    /// Payload bytes forwarded so far
    bytes_forwarded: u64,

    /// Frames emitted so far
    frames_emitted: u64,

    /// Frames emitted with a header that had already been used
    stale_frames: u64,
}

impl PublisherSession {
    /// Create a new session
    pub fn new(session_id: u64) -> Self {
        Self {
            session_id,
            phase: PublisherPhase::AwaitingHeader,
            pending_header: None,
            header_used: false,
            preamble: None,
            bytes_forwarded: 0,
            frames_emitted: 0,
            stale_frames: 0,
        }
    }

    /// Handle a text message
    ///
    /// Preambles are discarded. Anything else, parseable or not, replaces the
    /// pending header.
    pub fn on_text(&mut self, text: &str) -> TextOutcome {
        if Preamble::is_preamble(text) {
            match Preamble::parse(text) {
                Some(preamble) => {
                    tracing::info!(
                        session_id = self.session_id,
                        target = %preamble.target,
                        channel = ?preamble.channel,
                        source = ?preamble.source,
                        "Publisher preamble"
                    );
                    self.preamble = Some(preamble);
                }
                None => {
                    tracing::debug!(session_id = self.session_id, "Unparseable preamble ignored");
                }
            }
            return TextOutcome::Preamble;
        }

        let (fields, _) = decode_header(text.as_bytes());
        if fields.is_empty() {
            tracing::warn!(
                session_id = self.session_id,
                len = text.len(),
                "Header has no fields, forwarding as-is"
            );
        }

        self.pending_header = Some(Bytes::copy_from_slice(text.as_bytes()));
        self.header_used = false;
        self.phase = PublisherPhase::AwaitingPayload;

        TextOutcome::Header
    }

    /// Handle a binary message
    ///
    /// Returns the frame to broadcast, or `None` if no header has arrived yet.
    pub fn on_binary(&mut self, payload: &[u8]) -> Option<RelayFrame> {
        let header = match (self.phase, self.pending_header.as_ref()) {
            (PublisherPhase::AwaitingPayload, Some(header)) => header,
            _ => {
                tracing::debug!(
                    session_id = self.session_id,
                    len = payload.len(),
                    "Binary message before any header, dropped"
                );
                return None;
            }
        };

        if self.header_used {
            self.stale_frames += 1;
            tracing::debug!(
                session_id = self.session_id,
                "Binary message without new header, reusing previous header"
            );
        }

        let frame = RelayFrame::new(header, payload);

        self.header_used = true;
        self.frames_emitted += 1;
        self.bytes_forwarded += payload.len() as u64;

        tracing::trace!(
            session_id = self.session_id,
            total = self.bytes_forwarded,
            len = payload.len(),
            "Publisher chunk"
        );

        Some(frame)
    }

    pub fn phase(&self) -> PublisherPhase {
        self.phase
    }

    /// Header that the next binary message will be paired with
    pub fn pending_header(&self) -> Option<&Bytes> {
        self.pending_header.as_ref()
    }

    pub fn preamble(&self) -> Option<&Preamble> {
        self.preamble.as_ref()
    }

    /// Running total of payload bytes forwarded
    pub fn bytes_forwarded(&self) -> u64 {
        self.bytes_forwarded
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    pub fn stale_frames(&self) -> u64 {
        self.stale_frames
    }
}
