//! Relay frames
//!
//! A relay frame is the header text a publisher sent, immediately followed by
//! the binary payload that came after it. Subscribers receive it as a single
//! binary WebSocket message and split it again with [`RelayFrame::parse`].

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::protocol::{decode_header, HeaderBlock};

/// A frame to be broadcast to subscribers
///
/// Cheap to clone: the data is a reference-counted `Bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayFrame {
    data: Bytes,
    header_len: usize,
}

impl RelayFrame {
    /// Concatenate header bytes and payload into one frame
    pub fn new(header: &[u8], payload: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(header.len() + payload.len());
        buf.put_slice(header);
        buf.put_slice(payload);

        Self {
            data: buf.freeze(),
            header_len: header.len(),
        }
    }

    /// Split received frame bytes into header block and payload
    pub fn parse(data: Bytes) -> ParsedFrame {
        let (header, header_len) = decode_header(&data);
        let payload = data.slice(header_len..);

        ParsedFrame {
            header,
            header_len,
            payload,
        }
    }

    /// Whole frame as sent on the wire
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Header bytes at the front of the frame
    pub fn header_bytes(&self) -> Bytes {
        self.data.slice(..self.header_len)
    }

    /// Payload bytes after the header
    pub fn payload(&self) -> Bytes {
        self.data.slice(self.header_len..)
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A relay frame split back into its parts
#[derive(Debug, Clone)]
pub struct ParsedFrame {
    /// Decoded header fields (empty if the header was unparseable)
    pub header: HeaderBlock,
    /// Bytes consumed by the header
    pub header_len: usize,
    /// Remaining bytes
    pub payload: Bytes,
}

impl ParsedFrame {
    /// Verify the payload against `Content-Length`
    ///
    /// A header without `Content-Length` passes unchecked.
    pub fn check_length(&self) -> Result<(), ProtocolError> {
        match self.header.content_length()? {
            Some(declared) if declared != self.payload.len() => {
                Err(ProtocolError::LengthMismatch {
                    declared,
                    actual: self.payload.len(),
                })
            }
            _ => Ok(()),
        }
    }
}
