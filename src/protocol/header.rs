//! Header block codec
//!
//! A header block is a run of `Key: Value` lines, each ending in `\r\n`, closed
//! by an empty line. The grammar accepted on decode is:
//!
//! ```text
//! block  = *line CRLF
//! line   = key ":" value CRLF     ; exactly one colon
//! key    = 1*ascii                ; surrounding whitespace trimmed
//! value  = *ascii                 ; surrounding whitespace trimmed
//! ```
//!
//! Lines that do not contain exactly one colon (the multipart boundary line,
//! a request line, garbage) are skipped. Decoding stops at the first blank
//! line or at the first byte outside ASCII, whichever comes first, so the
//! caller can slice the remaining bytes off as the binary payload.

use bytes::Bytes;

use super::audio_format::AudioFormat;
use super::constants::*;
use crate::error::ProtocolError;

/// Ordered `Key: Value` fields of one header block
///
/// Keys are case-sensitive. Inserting an existing key overwrites its value
/// in place, so the last write wins while the key keeps its first position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    fields: Vec<(String, String)>,
}

impl HeaderBlock {
    /// Create an empty block
    pub fn new() -> Self {
        Self::default()
    }

    /// Header for one audio chunk of `len` bytes
    pub fn for_audio_chunk(len: usize, format: &AudioFormat) -> Self {
        Self::new()
            .with(CONTENT_TYPE, AUDIO_PCM_CONTENT_TYPE)
            .with(CONTENT_LENGTH, len.to_string())
            .with(X_AUDIO_FORMAT, format.to_tag())
    }

    /// Insert or overwrite a field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a field by exact name
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Declared payload length, if the block carries one
    pub fn content_length(&self) -> Result<Option<usize>, ProtocolError> {
        match self.get(CONTENT_LENGTH) {
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| ProtocolError::InvalidContentLength(v.to_string())),
            None => Ok(None),
        }
    }

    /// Typed view of the `X-Audio-Format` field
    pub fn audio_format(&self) -> Result<AudioFormat, ProtocolError> {
        let tag = self
            .get(X_AUDIO_FORMAT)
            .ok_or_else(|| ProtocolError::InvalidAudioFormat("missing".into()))?;
        AudioFormat::from_tag(tag)
    }
}

/// Render a block as `Key: Value\r\n` lines followed by a blank line
pub fn encode_header(block: &HeaderBlock) -> Bytes {
    Bytes::from(render(block))
}

/// Render a block as one multipart part header: boundary line, fields, blank line
///
/// This is the exact text a publisher sends in front of every audio chunk.
pub fn encode_part(boundary: &str, block: &HeaderBlock) -> String {
    let mut out = String::with_capacity(boundary.len() + 128);
    out.push_str(CRLF);
    out.push_str(boundary);
    out.push_str(CRLF);
    out.push_str(&render(block));
    out
}

/// Decode a header block from the front of `data`
///
/// Returns the parsed fields and the number of bytes consumed, including a
/// leading byte order mark and the terminating blank line when present. An
/// input without any parseable line yields an empty block.
pub fn decode_header(data: &[u8]) -> (HeaderBlock, usize) {
    let start = if data.starts_with(UTF8_BOM) {
        UTF8_BOM.len()
    } else {
        0
    };

    let mut end = start;
    while end < data.len() && data[end].is_ascii() {
        if data[end..].starts_with(HEADER_TERMINATOR) {
            end += HEADER_TERMINATOR.len();
            break;
        }
        end += 1;
    }

    let text = String::from_utf8_lossy(&data[start..end]);
    (parse_fields(&text), end)
}

/// Parse `Key: Value` lines, skipping anything else
pub(crate) fn parse_fields(text: &str) -> HeaderBlock {
    let mut block = HeaderBlock::new();

    for line in text.split(CRLF) {
        let mut parts = line.split(':');
        if let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) {
            let key = key.trim();
            if !key.is_empty() {
                block.insert(key, value.trim());
            }
        }
    }

    block
}

fn render(block: &HeaderBlock) -> String {
    let mut out = String::new();
    for (key, value) in block.iter() {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push_str(CRLF);
    }
    out.push_str(CRLF);
    out
}
