//! Protocol constants

/// Default listening port of the relay
pub const DEFAULT_PORT: u16 = 9001;

/// Line separator inside header blocks
pub const CRLF: &str = "\r\n";

/// Blank line that ends a header block
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// UTF-8 byte order mark, skipped in front of a header block
pub const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Substring that marks a text message as the publisher preamble
pub const PREAMBLE_MARKER: &str = "POST ";

/// Substring of the request path that selects the subscriber role
pub const SUBSCRIBER_PATH_MARKER: &str = "get";

/// Multipart boundary used between audio chunks
pub const DEFAULT_BOUNDARY: &str = "--agilemedia";

/// Header field names
pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const X_AUDIO_FORMAT: &str = "X-Audio-Format";
pub const USER_AGENT: &str = "User-Agent";

/// Content type of each audio part
pub const AUDIO_PCM_CONTENT_TYPE: &str = "audio/pcm";

/// Content type announced by the preamble (boundary appended)
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/x-mixed-replace;boundary=";

/// Sample format label carried in `X-Audio-Format`
pub const DEFAULT_PCM_FORMAT: &str = "pcm_16";

/// Default user agent sent by the Rust publisher
pub const DEFAULT_USER_AGENT: &str = "pcm-relay-publisher";
