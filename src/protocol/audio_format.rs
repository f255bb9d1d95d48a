//! `X-Audio-Format` tag handling
//!
//! The tag is a space-separated list of `key=value` tokens, in practice
//! `format=pcm_16; channel=1; frequency=48000`. Browsers join the tokens with
//! `"; "`, so every value but the last carries a trailing `;` which is trimmed.

use std::collections::HashMap;
use std::fmt;

use super::constants::DEFAULT_PCM_FORMAT;
use crate::error::ProtocolError;

/// Split an `X-Audio-Format` value into its `key=value` tokens
///
/// Tokens without exactly one `=` are discarded.
pub fn parse_audio_format_tag(value: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();

    for token in value.split(' ') {
        let mut parts = token.split('=');
        if let (Some(key), Some(val), None) = (parts.next(), parts.next(), parts.next()) {
            out.insert(key.to_string(), val.trim_end_matches(';').to_string());
        }
    }

    out
}

/// Audio parameters carried out-of-band in each chunk header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample format label (e.g., "pcm_16")
    pub format: String,
    /// Channel count
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioFormat {
    /// Single-channel format at the given sample rate
    pub fn mono(sample_rate: u32) -> Self {
        Self {
            format: DEFAULT_PCM_FORMAT.to_string(),
            channels: 1,
            sample_rate,
        }
    }

    /// Parse from an `X-Audio-Format` value
    ///
    /// `frequency` is required; `format` and `channel` fall back to
    /// `pcm_16` and 1.
    pub fn from_tag(value: &str) -> Result<Self, ProtocolError> {
        let tokens = parse_audio_format_tag(value);
        let invalid = || ProtocolError::InvalidAudioFormat(value.to_string());

        let sample_rate = tokens
            .get("frequency")
            .ok_or_else(invalid)?
            .parse()
            .map_err(|_| invalid())?;

        let channels = match tokens.get("channel") {
            Some(c) => c.parse().map_err(|_| invalid())?,
            None => 1,
        };

        let format = tokens
            .get("format")
            .cloned()
            .unwrap_or_else(|| DEFAULT_PCM_FORMAT.to_string());

        Ok(Self {
            format,
            channels,
            sample_rate,
        })
    }

    /// Render as an `X-Audio-Format` value
    pub fn to_tag(&self) -> String {
        format!(
            "format={}; channel={}; frequency={}",
            self.format, self.channels, self.sample_rate
        )
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}ch {}Hz",
            self.format, self.channels, self.sample_rate
        )
    }
}
