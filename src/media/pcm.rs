//! Raw PCM sample buffers

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::AudioFormat;

/// Size of one `f32` sample on the wire
pub const BYTES_PER_SAMPLE: usize = 4;

/// Encode samples as little-endian `f32` bytes
pub fn samples_to_bytes(samples: &[f32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for sample in samples {
        buf.put_f32_le(*sample);
    }
    buf.freeze()
}

/// Decode little-endian `f32` bytes; a trailing partial sample is ignored
pub fn bytes_to_samples(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(BYTES_PER_SAMPLE)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// One buffer of captured audio with its format
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub format: AudioFormat,
    pub data: Bytes,
}

impl AudioChunk {
    /// Build a chunk from samples
    pub fn from_samples(format: AudioFormat, samples: &[f32]) -> Self {
        Self {
            format,
            data: samples_to_bytes(samples),
        }
    }

    /// Number of samples per channel
    pub fn frame_count(&self) -> usize {
        let channels = usize::from(self.format.channels.max(1));
        self.data.len() / BYTES_PER_SAMPLE / channels
    }

    /// Playback duration of the chunk
    pub fn duration(&self) -> Duration {
        if self.format.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / f64::from(self.format.sample_rate))
    }

    pub fn samples(&self) -> Vec<f32> {
        bytes_to_samples(&self.data)
    }
}
