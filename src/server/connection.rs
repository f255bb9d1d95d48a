//! Per-connection handling
//!
//! Each accepted socket gets one task running [`Connection::run`]: the
//! WebSocket upgrade (with origin check and path capture), role
//! classification, then the receive loop for that role. Messages on one
//! connection are handled strictly in arrival order.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{header::ORIGIN, StatusCode};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_tungstenite::{accept_hdr_async_with_config, WebSocketStream};

use crate::error::{Error, Result};
use crate::registry::SubscriberRegistry;
use crate::server::config::{ServerConfig, ServerMode};
use crate::session::{ConnectionContext, ConnectionRole, PublisherSession};
use crate::stats::{ServerCounters, SessionStats};

type WsStream = WebSocketStream<TcpStream>;

/// One accepted connection
pub struct Connection {
    ctx: ConnectionContext,
    socket: TcpStream,
    config: ServerConfig,
    registry: Arc<SubscriberRegistry>,
    counters: Arc<ServerCounters>,
    stats: SessionStats,
}

impl Connection {
    /// Create a connection handler for an accepted socket
    pub fn new(
        session_id: u64,
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: ServerConfig,
        registry: Arc<SubscriberRegistry>,
        counters: Arc<ServerCounters>,
    ) -> Self {
        Self {
            ctx: ConnectionContext::new(session_id, peer_addr),
            socket,
            config,
            registry,
            counters,
            stats: SessionStats::new(),
        }
    }

    /// Upgrade, classify and serve the connection until it closes
    pub async fn run(self) -> Result<()> {
        let Connection {
            mut ctx,
            socket,
            config,
            registry,
            counters,
            mut stats,
        } = self;

        let ws = match upgrade(&mut ctx, socket, &config).await {
            Ok(Some(ws)) => ws,
            Ok(None) => {
                counters.rejected();
                return Ok(());
            }
            Err(e) => {
                counters.rejected();
                tracing::warn!(
                    session_id = ctx.session_id,
                    peer = %ctx.peer_addr,
                    error = %e,
                    "WebSocket upgrade failed"
                );
                return Err(e);
            }
        };

        let result = match config.mode {
            ServerMode::Echo => {
                tracing::info!(
                    session_id = ctx.session_id,
                    peer = %ctx.peer_addr,
                    path = %ctx.path,
                    "Echo connection accepted"
                );
                run_echo(&ctx, ws, &mut stats).await
            }
            ServerMode::Relay => {
                let role = ctx.classify(&config.subscriber_path_marker);
                tracing::info!(
                    session_id = ctx.session_id,
                    peer = %ctx.peer_addr,
                    path = %ctx.path,
                    origin = ?ctx.origin,
                    role = %role,
                    "Connection accepted"
                );

                match role {
                    ConnectionRole::Subscriber => {
                        run_subscriber(&ctx, ws, &registry, &mut stats).await
                    }
                    _ => run_publisher(&ctx, ws, &registry, &counters, &mut stats).await,
                }
            }
        };

        tracing::info!(
            session_id = ctx.session_id,
            peer = %ctx.peer_addr,
            role = %ctx.role,
            received = stats.bytes_received,
            sent = stats.bytes_sent,
            duration_ms = stats.duration().as_millis() as u64,
            bitrate = stats.bitrate_over(stats.duration()),
            "Peer disconnected"
        );

        result
    }
}

/// Perform the WebSocket upgrade
///
/// Records the request path and origin on `ctx`. Returns `None` if the origin
/// was rejected; the peer has already received a 403 in that case.
async fn upgrade(
    ctx: &mut ConnectionContext,
    socket: TcpStream,
    config: &ServerConfig,
) -> Result<Option<WsStream>> {
    let mut path = String::new();
    let mut origin: Option<String> = None;
    let mut rejected = false;

    let callback = |req: &Request, resp: Response| -> std::result::Result<Response, ErrorResponse> {
        path = req
            .uri()
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        origin = req
            .headers()
            .get(ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if config.origin_allowed(origin.as_deref()) {
            Ok(resp)
        } else {
            rejected = true;
            let mut err = ErrorResponse::new(Some("Origin not allowed".to_string()));
            *err.status_mut() = StatusCode::FORBIDDEN;
            Err(err)
        }
    };

    let mut ws_config = WebSocketConfig::default();
    if let Some(size) = config.max_message_size {
        ws_config = ws_config.max_message_size(Some(size));
    }

    let handshake = accept_hdr_async_with_config(socket, callback, Some(ws_config));
    let result = tokio::time::timeout(config.handshake_timeout, handshake)
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "WebSocket handshake timed out"))?;

    ctx.path = path;
    ctx.origin = origin;

    match result {
        Ok(ws) => Ok(Some(ws)),
        Err(_) if rejected => {
            tracing::warn!(
                session_id = ctx.session_id,
                peer = %ctx.peer_addr,
                origin = ?ctx.origin,
                "Connection from origin rejected"
            );
            Ok(None)
        }
        Err(e) => Err(Error::WebSocket(e)),
    }
}

/// Receive loop of the publisher
async fn run_publisher(
    ctx: &ConnectionContext,
    mut ws: WsStream,
    registry: &SubscriberRegistry,
    counters: &ServerCounters,
    stats: &mut SessionStats,
) -> Result<()> {
    let mut evicted = match registry.register_publisher(ctx.session_id, ctx.peer_addr).await {
        Ok(rx) => rx,
        Err(e) => {
            counters.rejected();
            let frame = CloseFrame {
                code: CloseCode::Policy,
                reason: Utf8Bytes::from_static("publisher already active"),
            };
            let _ = ws.close(Some(frame)).await;
            tracing::warn!(session_id = ctx.session_id, error = %e, "Publisher refused");
            return Err(e.into());
        }
    };

    let mut session = PublisherSession::new(ctx.session_id);

    let result = loop {
        tokio::select! {
            _ = &mut evicted => {
                tracing::info!(session_id = ctx.session_id, "Publisher evicted by a newer publisher");
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: Utf8Bytes::from_static("replaced by another publisher"),
                };
                let _ = ws.close(Some(frame)).await;
                break Ok(());
            }
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    stats.on_receive(text.len());
                    session.on_text(text.as_str());
                }
                Some(Ok(Message::Binary(data))) => {
                    stats.on_receive(data.len());
                    if let Some(frame) = session.on_binary(&data) {
                        registry.broadcast(frame).await;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(Error::WebSocket(e)),
            }
        }
    };

    tracing::info!(
        session_id = ctx.session_id,
        frames = session.frames_emitted(),
        bytes = session.bytes_forwarded(),
        stale_frames = session.stale_frames(),
        "Publisher session ended"
    );

    // An evicted publisher no longer owns the slot; that is not an error here
    let _ = registry.unregister_publisher(ctx.session_id).await;

    result
}

/// Forward loop of a subscriber
async fn run_subscriber(
    ctx: &ConnectionContext,
    ws: WsStream,
    registry: &SubscriberRegistry,
    stats: &mut SessionStats,
) -> Result<()> {
    let mut frames = registry.register(ctx.session_id, ctx.peer_addr).await;
    let (mut sink, mut stream) = ws.split();

    let result = loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => {
                    let len = frame.len();
                    if let Err(e) = sink.send(Message::Binary(frame.into_bytes())).await {
                        break Err(Error::WebSocket(e));
                    }
                    stats.on_send(len);
                }
                None => break Ok(()),
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    stats.on_receive(text.len());
                    let request = text.as_str().trim_end();
                    if registry.record_request(ctx.session_id, request).await {
                        tracing::info!(session_id = ctx.session_id, request = %request, "Subscriber request");
                    } else {
                        tracing::debug!(session_id = ctx.session_id, message = %request, "Subscriber message ignored");
                    }
                }
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(Error::WebSocket(e)),
            }
        }
    };

    // Completes the close handshake if the peer started it
    let _ = sink.close().await;
    registry.unregister(ctx.session_id).await;

    result
}

/// Echo loop: text back as text, binary back as binary
async fn run_echo(ctx: &ConnectionContext, mut ws: WsStream, stats: &mut SessionStats) -> Result<()> {
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => {
                stats.on_receive(text.len());
                tracing::debug!(session_id = ctx.session_id, message = %text.as_str(), "Echo text");
                let len = text.len();
                ws.send(Message::Text(text)).await?;
                stats.on_send(len);
            }
            Message::Binary(data) => {
                stats.on_receive(data.len());
                tracing::debug!(
                    session_id = ctx.session_id,
                    total = stats.bytes_received,
                    len = data.len(),
                    "Echo binary"
                );
                let len = data.len();
                ws.send(Message::Binary(data)).await?;
                stats.on_send(len);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}
