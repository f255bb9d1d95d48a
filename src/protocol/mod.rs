//! Wire protocol for the relay
//!
//! Publishers speak a pseudo-HTTP dialect over WebSocket text messages:
//! one `POST` preamble, then for every audio chunk a multipart-style header
//! block followed by a binary message carrying the PCM bytes.
//!
//! - [`header`]: `Key: Value` header blocks terminated by a blank line
//! - [`audio_format`]: the `X-Audio-Format` tag (`format=… channel=… frequency=…`)
//! - [`preamble`]: the `POST /live?channel=…&source=…` opening message

pub mod audio_format;
pub mod constants;
pub mod header;
pub mod preamble;

pub use audio_format::{parse_audio_format_tag, AudioFormat};
pub use header::{decode_header, encode_header, encode_part, HeaderBlock};
pub use preamble::Preamble;
