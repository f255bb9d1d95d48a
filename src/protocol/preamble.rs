//! Publisher preamble
//!
//! Before its first audio chunk a publisher sends one text message shaped
//! like an HTTP request head:
//!
//! ```text
//! POST /live?channel=100&source=1 HTTP/1.1\r\n
//! User-Agent: <agent>\r\n
//! Content-Type: multipart/x-mixed-replace;boundary=--agilemedia\r\n
//! ```
//!
//! The relay never stores it as a chunk header; it is parsed for logging only.

use super::constants::*;
use super::header::{parse_fields, HeaderBlock};

/// Parsed publisher preamble
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    pub method: String,
    pub target: String,
    pub version: String,
    /// `channel` query parameter
    pub channel: Option<String>,
    /// `source` query parameter
    pub source: Option<String>,
    /// Fields following the request line
    pub headers: HeaderBlock,
}

impl Preamble {
    /// Whether a text message is a preamble rather than a chunk header
    pub fn is_preamble(text: &str) -> bool {
        text.contains(PREAMBLE_MARKER)
    }

    /// Parse a preamble message
    ///
    /// Returns `None` if no line holds a `POST` request line.
    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = text.split(CRLF).skip_while(|l| !l.contains(PREAMBLE_MARKER));
        let request_line = lines.next()?;

        let mut words = request_line[request_line.find(PREAMBLE_MARKER)?..].split_whitespace();
        let method = words.next()?.to_string();
        let target = words.next().unwrap_or("/").to_string();
        let version = words.next().unwrap_or_default().to_string();

        let rest: Vec<&str> = lines.collect();
        let headers = parse_fields(&rest.join(CRLF));

        let (channel, source) = query_ids(&target);

        Some(Self {
            method,
            target,
            version,
            channel,
            source,
            headers,
        })
    }

    /// Render the preamble a publisher sends once per connection
    pub fn render(channel: &str, source: &str, user_agent: &str, boundary: &str) -> String {
        format!(
            "POST /live?channel={channel}&source={source} HTTP/1.1{CRLF}\
             {USER_AGENT}: {user_agent}{CRLF}\
             {CONTENT_TYPE}: {MULTIPART_CONTENT_TYPE}{boundary}{CRLF}"
        )
    }

    /// Boundary announced in the `Content-Type` field
    pub fn boundary(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)?
            .strip_prefix(MULTIPART_CONTENT_TYPE)
    }
}

fn query_ids(target: &str) -> (Option<String>, Option<String>) {
    let mut channel = None;
    let mut source = None;

    if let Some((_, query)) = target.split_once('?') {
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("channel", v)) => channel = Some(v.to_string()),
                Some(("source", v)) => source = Some(v.to_string()),
                _ => {}
            }
        }
    }

    (channel, source)
}
