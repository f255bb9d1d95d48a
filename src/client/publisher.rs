//! Relay publisher
//!
//! Streams PCM chunks to a relay the way a capturing browser does: one
//! preamble per connection, then a header text message and a binary message
//! per chunk.

use bytes::Bytes;
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{Error, ProtocolError, Result};
use crate::media::AudioChunk;
use crate::protocol::{encode_part, HeaderBlock, Preamble};

use super::config::ClientConfig;

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Relay publisher
///
/// # Example
/// ```no_run
/// use pcm_relay::client::{ClientConfig, RelayPublisher};
/// use pcm_relay::media::AudioChunk;
/// use pcm_relay::protocol::AudioFormat;
///
/// # async fn example() -> pcm_relay::error::Result<()> {
/// let mut publisher = RelayPublisher::new(ClientConfig::new("ws://localhost:9001/"));
/// publisher.connect().await?;
///
/// let chunk = AudioChunk::from_samples(AudioFormat::mono(48000), &[0.0; 2048]);
/// publisher.send_chunk(&chunk).await?;
/// # Ok(())
/// # }
/// ```
pub struct RelayPublisher {
    config: ClientConfig,
    ws: Option<ClientStream>,
    preamble_sent: bool,
    bytes_sent: u64,
    chunks_sent: u64,
}

impl RelayPublisher {
    /// Create a new publisher
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            ws: None,
            preamble_sent: false,
            bytes_sent: 0,
            chunks_sent: 0,
        }
    }

    /// Connect to the relay
    pub async fn connect(&mut self) -> Result<()> {
        let (ws, _) = connect_async(self.config.url.as_str()).await?;
        tracing::debug!(url = %self.config.url, "Publisher connected");

        self.ws = Some(ws);
        self.preamble_sent = false;
        Ok(())
    }

    /// Send one audio chunk: preamble (first time only), header, payload
    pub async fn send_chunk(&mut self, chunk: &AudioChunk) -> Result<()> {
        if !self.preamble_sent {
            let preamble = Preamble::render(
                &self.config.channel,
                &self.config.source,
                &self.config.user_agent,
                &self.config.boundary,
            );
            self.send_text(&preamble).await?;
            self.preamble_sent = true;
        }

        let header = HeaderBlock::for_audio_chunk(chunk.data.len(), &chunk.format);
        let text = encode_part(&self.config.boundary, &header);
        self.send_text(&text).await?;
        self.send_binary(chunk.data.clone()).await?;

        self.chunks_sent += 1;
        Ok(())
    }

    /// Send a raw text message
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        let ws = self.stream()?;
        ws.send(Message::text(text.to_string())).await?;
        Ok(())
    }

    /// Send a raw binary message
    pub async fn send_binary(&mut self, data: Bytes) -> Result<()> {
        let len = data.len() as u64;
        let ws = self.stream()?;
        ws.send(Message::Binary(data)).await?;
        self.bytes_sent += len;
        Ok(())
    }

    /// Close the connection
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut ws) = self.ws.take() {
            ws.close(None).await?;
        }
        Ok(())
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        self.ws.is_some()
    }

    /// Payload bytes sent so far
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn chunks_sent(&self) -> u64 {
        self.chunks_sent
    }

    fn stream(&mut self) -> Result<&mut ClientStream> {
        self.ws.as_mut().ok_or_else(|| {
            Error::Protocol(ProtocolError::UnexpectedMessage("Not connected".into()))
        })
    }
}
