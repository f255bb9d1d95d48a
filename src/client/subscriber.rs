//! Relay subscriber
//!
//! Receives relay frames and splits them back into header and PCM payload,
//! the way a playing browser does.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::Result;
use crate::media::AudioChunk;
use crate::protocol::constants::CRLF;
use crate::registry::{ParsedFrame, RelayFrame};

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Relay subscriber
pub struct RelaySubscriber {
    ws: ClientStream,
    frames_received: u64,
    bytes_received: u64,
}

impl RelaySubscriber {
    /// Connect to a subscriber URL (its path must contain the subscriber marker)
    ///
    /// A non-empty `request` is sent once, terminated by a blank line.
    pub async fn connect(url: &str, request: Option<&str>) -> Result<Self> {
        let (mut ws, _) = connect_async(url).await?;
        tracing::debug!(url = %url, "Subscriber connected");

        if let Some(request) = request.filter(|r| !r.is_empty()) {
            ws.send(Message::text(format!("{request}{CRLF}{CRLF}")))
                .await?;
        }

        Ok(Self {
            ws,
            frames_received: 0,
            bytes_received: 0,
        })
    }

    /// Wait for the next relay frame
    ///
    /// Returns `None` once the relay closes the connection.
    pub async fn recv(&mut self) -> Result<Option<ParsedFrame>> {
        while let Some(msg) = self.ws.next().await {
            match msg? {
                Message::Binary(data) => {
                    self.frames_received += 1;
                    self.bytes_received += data.len() as u64;
                    return Ok(Some(RelayFrame::parse(data)));
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        Ok(None)
    }

    /// Wait for the next frame and decode it as an audio chunk
    pub async fn recv_chunk(&mut self) -> Result<Option<AudioChunk>> {
        let Some(frame) = self.recv().await? else {
            return Ok(None);
        };

        frame.check_length()?;
        let format = frame.header.audio_format()?;

        Ok(Some(AudioChunk {
            format,
            data: frame.payload,
        }))
    }

    /// Close the connection
    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}
