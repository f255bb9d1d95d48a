//! Media payload helpers
//!
//! Payloads on the wire are raw little-endian 32-bit float samples, whatever
//! the `format` label in the header says.

pub mod pcm;

pub use pcm::{bytes_to_samples, samples_to_bytes, AudioChunk, BYTES_PER_SAMPLE};
