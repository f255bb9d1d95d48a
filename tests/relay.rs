//! End-to-end relay scenarios over real WebSocket connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

use pcm_relay::client::{ClientConfig, RelayPublisher, RelaySubscriber};
use pcm_relay::media::{samples_to_bytes, AudioChunk};
use pcm_relay::protocol::constants::DEFAULT_BOUNDARY;
use pcm_relay::protocol::{encode_part, AudioFormat, HeaderBlock};
use pcm_relay::registry::{ParsedFrame, PublisherPolicy, RegistryConfig};
use pcm_relay::{RelayServer, ServerConfig, ServerMode};

const WAIT: Duration = Duration::from_secs(5);

async fn start(server: RelayServer) -> (Arc<RelayServer>, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Arc::new(server);
    let serving = Arc::clone(&server);
    tokio::spawn(async move {
        let _ = serving.serve(listener).await;
    });

    (server, addr)
}

async fn start_relay() -> (Arc<RelayServer>, SocketAddr) {
    start(RelayServer::new(ServerConfig::default())).await
}

async fn wait_subscribers(server: &RelayServer, n: usize) {
    timeout(WAIT, async {
        while server.registry().subscriber_count().await != n {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscriber count not reached");
}

async fn wait_publisher(server: &RelayServer, not: Option<u64>) -> u64 {
    timeout(WAIT, async {
        loop {
            match server.registry().publisher_id().await {
                Some(id) if Some(id) != not => return id,
                _ => sleep(Duration::from_millis(10)).await,
            }
        }
    })
    .await
    .expect("publisher not registered")
}

async fn wait_rejected(server: &RelayServer, n: u64) {
    timeout(WAIT, async {
        while server.stats().rejected_connections != n {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("rejection not counted");
}

async fn next_frame(sub: &mut RelaySubscriber) -> ParsedFrame {
    timeout(WAIT, sub.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("receive failed")
        .expect("connection closed")
}

async fn connect_publisher(addr: SocketAddr) -> RelayPublisher {
    let mut publisher = RelayPublisher::new(ClientConfig::new(format!("ws://{addr}/post")));
    tokio_test::assert_ok!(publisher.connect().await);
    publisher
}

async fn connect_subscriber(addr: SocketAddr, request: Option<&str>) -> RelaySubscriber {
    tokio_test::assert_ok!(RelaySubscriber::connect(&format!("ws://{addr}/get"), request).await)
}

async fn echo_text(ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>, text: &str) {
    ws.send(Message::text(text.to_string())).await.unwrap();
    match timeout(WAIT, ws.next()).await.unwrap() {
        Some(Ok(Message::Text(echoed))) => assert_eq!(echoed.as_str(), text),
        other => panic!("unexpected echo: {:?}", other),
    }
}

fn chunk_header(len: usize, sample_rate: u32) -> String {
    encode_part(
        DEFAULT_BOUNDARY,
        &HeaderBlock::for_audio_chunk(len, &AudioFormat::mono(sample_rate)),
    )
}

#[tokio::test]
async fn test_two_subscribers_receive_identical_frames() {
    let (server, addr) = start_relay().await;

    let mut sub1 = connect_subscriber(addr, None).await;
    let mut sub2 = connect_subscriber(addr, Some("channel=100")).await;
    wait_subscribers(&server, 2).await;

    let mut publisher = connect_publisher(addr).await;
    let chunk = AudioChunk::from_samples(AudioFormat::mono(44100), &[0.25; 2048]);
    assert_eq!(chunk.data.len(), 8192);
    publisher.send_chunk(&chunk).await.unwrap();

    let f1 = next_frame(&mut sub1).await;
    let f2 = next_frame(&mut sub2).await;

    let header_len = chunk_header(8192, 44100).len();
    assert_eq!(f1.header_len, header_len);
    assert_eq!(f1.header_len + f1.payload.len(), header_len + 8192);
    assert_eq!(f1.payload, chunk.data);

    assert_eq!(f1.header, f2.header);
    assert_eq!(f1.header_len, f2.header_len);
    assert_eq!(f1.payload, f2.payload);

    assert_eq!(f1.header.audio_format().unwrap().sample_rate, 44100);
    assert!(f1.check_length().is_ok());

    let stats = server.registry().stats().await;
    assert_eq!(stats.frames_broadcast, 1);
    assert_eq!(stats.deliveries, 2);
}

#[tokio::test]
async fn test_subscriber_leaving_between_sends() {
    let (server, addr) = start_relay().await;

    let mut staying = connect_subscriber(addr, None).await;
    let mut leaving = connect_subscriber(addr, None).await;
    wait_subscribers(&server, 2).await;

    let mut publisher = connect_publisher(addr).await;
    let format = AudioFormat::mono(48000);

    publisher
        .send_chunk(&AudioChunk::from_samples(format.clone(), &[0.1; 256]))
        .await
        .unwrap();
    next_frame(&mut staying).await;
    next_frame(&mut leaving).await;

    leaving.close().await.unwrap();
    wait_subscribers(&server, 1).await;

    publisher
        .send_chunk(&AudioChunk::from_samples(format, &[0.2; 256]))
        .await
        .unwrap();
    let second = next_frame(&mut staying).await;
    assert_eq!(second.payload, samples_to_bytes(&[0.2; 256]));

    let stats = server.registry().stats().await;
    assert_eq!(stats.frames_broadcast, 2);
    assert_eq!(stats.deliveries, 3);
    assert_eq!(stats.subscriber_count, 1);
}

#[tokio::test]
async fn test_consecutive_binaries_reuse_header() {
    let (server, addr) = start_relay().await;

    let mut sub = connect_subscriber(addr, None).await;
    wait_subscribers(&server, 1).await;

    let mut publisher = connect_publisher(addr).await;
    publisher.send_text(&chunk_header(8, 16000)).await.unwrap();
    publisher
        .send_binary(samples_to_bytes(&[1.0, 2.0]))
        .await
        .unwrap();
    publisher
        .send_binary(samples_to_bytes(&[3.0, 4.0]))
        .await
        .unwrap();

    let first = next_frame(&mut sub).await;
    let second = next_frame(&mut sub).await;

    assert_eq!(first.header_len, second.header_len);
    assert_eq!(first.header, second.header);
    assert_eq!(first.payload, samples_to_bytes(&[1.0, 2.0]));
    assert_eq!(second.payload, samples_to_bytes(&[3.0, 4.0]));
}

#[tokio::test]
async fn test_binary_before_header_not_relayed() {
    let (server, addr) = start_relay().await;

    let mut sub = connect_subscriber(addr, None).await;
    wait_subscribers(&server, 1).await;

    let mut publisher = connect_publisher(addr).await;
    publisher
        .send_binary(Bytes::from_static(&[0xFF; 16]))
        .await
        .unwrap();
    publisher
        .send_chunk(&AudioChunk::from_samples(AudioFormat::mono(8000), &[0.5; 4]))
        .await
        .unwrap();

    // the orphan payload is dropped; the first frame is the real chunk
    let frame = next_frame(&mut sub).await;
    assert_eq!(frame.payload, samples_to_bytes(&[0.5; 4]));
    assert_eq!(server.registry().stats().await.frames_broadcast, 1);
}

#[tokio::test]
async fn test_subscriber_request_recorded() {
    let (server, addr) = start_relay().await;

    let _sub = connect_subscriber(addr, Some("channel=100&source=1")).await;
    wait_subscribers(&server, 1).await;

    // first connection gets session 1
    timeout(WAIT, async {
        while server.registry().request_of(1).await.is_none() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("request not recorded");

    assert_eq!(
        server.registry().request_of(1).await.as_deref(),
        Some("channel=100&source=1")
    );
}

#[tokio::test]
async fn test_second_publisher_replaces_first() {
    let (server, addr) = start_relay().await;

    let mut sub = connect_subscriber(addr, None).await;
    wait_subscribers(&server, 1).await;

    let mut first = connect_publisher(addr).await;
    first
        .send_chunk(&AudioChunk::from_samples(AudioFormat::mono(8000), &[0.0; 4]))
        .await
        .unwrap();
    next_frame(&mut sub).await;
    let first_id = wait_publisher(&server, None).await;

    let mut second = connect_publisher(addr).await;
    let second_id = wait_publisher(&server, Some(first_id)).await;
    assert_ne!(first_id, second_id);

    second
        .send_chunk(&AudioChunk::from_samples(AudioFormat::mono(8000), &[0.75; 4]))
        .await
        .unwrap();
    let frame = next_frame(&mut sub).await;
    assert_eq!(frame.payload, samples_to_bytes(&[0.75; 4]));

    // subscriber survives the publisher switch
    assert_eq!(server.registry().subscriber_count().await, 1);
}

#[tokio::test]
async fn test_second_publisher_rejected() {
    let registry_config = RegistryConfig::default().publisher_policy(PublisherPolicy::Reject);
    let (server, addr) = start(RelayServer::with_registry_config(
        ServerConfig::default(),
        registry_config,
    ))
    .await;

    let _first = connect_publisher(addr).await;
    let first_id = wait_publisher(&server, None).await;

    let _second = connect_publisher(addr).await;
    timeout(WAIT, async {
        while server.stats().rejected_connections == 0 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("second publisher not rejected");

    assert_eq!(server.registry().publisher_id().await, Some(first_id));
}

#[tokio::test]
async fn test_publisher_disconnect_keeps_subscribers() {
    let (server, addr) = start_relay().await;

    let _sub = connect_subscriber(addr, None).await;
    wait_subscribers(&server, 1).await;

    let mut publisher = connect_publisher(addr).await;
    wait_publisher(&server, None).await;
    publisher.disconnect().await.unwrap();

    timeout(WAIT, async {
        while server.registry().publisher_id().await.is_some() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("publisher not released");

    assert_eq!(server.registry().subscriber_count().await, 1);
}

#[tokio::test]
async fn test_echo_mode() {
    let config = ServerConfig::default().mode(ServerMode::Echo);
    let (_server, addr) = start(RelayServer::new(config)).await;

    let (mut ws, _) = connect_async(format!("ws://{addr}/")).await.unwrap();

    ws.send(Message::text("hello relay".to_string())).await.unwrap();
    match timeout(WAIT, ws.next()).await.unwrap() {
        Some(Ok(Message::Text(text))) => assert_eq!(text.as_str(), "hello relay"),
        other => panic!("unexpected echo: {:?}", other),
    }

    ws.send(Message::Binary(Bytes::from_static(&[1, 2, 3, 0x80])))
        .await
        .unwrap();
    match timeout(WAIT, ws.next()).await.unwrap() {
        Some(Ok(Message::Binary(data))) => assert_eq!(&data[..], &[1, 2, 3, 0x80]),
        other => panic!("unexpected echo: {:?}", other),
    }
}

#[tokio::test]
async fn test_origin_check() {
    let config = ServerConfig::default().allow_origin("http://allowed.example");
    let (server, addr) = start(RelayServer::new(config)).await;

    // no Origin header
    let refused = connect_async(format!("ws://{addr}/get")).await;
    assert!(refused.is_err());

    let mut request = format!("ws://{addr}/get").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Origin", HeaderValue::from_static("http://allowed.example"));
    let accepted = connect_async(request).await;
    assert!(accepted.is_ok());

    wait_subscribers(&server, 1).await;
    wait_rejected(&server, 1).await;
}

#[tokio::test]
async fn test_malformed_upgrade_rejected() {
    let (server, addr) = start_relay().await;

    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(b"GARBAGE\r\n\r\n").await.unwrap();

    wait_rejected(&server, 1).await;
    assert_eq!(server.registry().subscriber_count().await, 0);
    assert_eq!(server.registry().publisher_id().await, None);
}

#[tokio::test]
async fn test_silent_peer_dropped_after_handshake_timeout() {
    let config = ServerConfig::default().handshake_timeout(Duration::from_millis(200));
    let (server, addr) = start(RelayServer::new(config)).await;

    let started = Instant::now();
    let mut socket = TcpStream::connect(addr).await.unwrap();

    // never send the upgrade request; the relay must hang up on its own
    let mut buf = [0u8; 64];
    let read = timeout(WAIT, socket.read(&mut buf))
        .await
        .expect("silent peer was never dropped");
    assert!(matches!(read, Ok(0) | Err(_)));
    assert!(started.elapsed() >= Duration::from_millis(150));

    wait_rejected(&server, 1).await;
}

#[tokio::test]
async fn test_connection_limit() {
    let config = ServerConfig::default()
        .mode(ServerMode::Echo)
        .max_connections(1);
    let (server, addr) = start(RelayServer::new(config)).await;

    let (mut first, _) = connect_async(format!("ws://{addr}/")).await.unwrap();
    echo_text(&mut first, "one").await;

    let second = connect_async(format!("ws://{addr}/")).await;
    assert!(second.is_err());
    wait_rejected(&server, 1).await;

    // the connection holding the only slot is unaffected
    echo_text(&mut first, "two").await;

    let stats = server.stats();
    assert_eq!(stats.total_connections, 1);
    assert_eq!(stats.active_connections, 1);
}

#[tokio::test]
async fn test_run_until_stops_on_shutdown() {
    let config = ServerConfig::with_addr("127.0.0.1:0".parse().unwrap());
    let server = Arc::new(RelayServer::new(config));
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let serving = Arc::clone(&server);
    let running = tokio::spawn(async move {
        serving
            .run_until(async {
                let _ = stop_rx.await;
            })
            .await
    });

    sleep(Duration::from_millis(50)).await;
    assert!(!running.is_finished());

    stop_tx.send(()).unwrap();
    let result = timeout(WAIT, running)
        .await
        .expect("server did not stop")
        .expect("server task panicked");
    tokio_test::assert_ok!(result);
}

#[tokio::test]
async fn test_subscriber_close_acknowledged() {
    let (server, addr) = start_relay().await;

    let (mut ws, _) = connect_async(format!("ws://{addr}/get")).await.unwrap();
    wait_subscribers(&server, 1).await;

    ws.close(None).await.unwrap();
    match timeout(WAIT, ws.next()).await.unwrap() {
        Some(Ok(Message::Close(_))) => {}
        other => panic!("expected close reply, got {:?}", other),
    }

    wait_subscribers(&server, 0).await;
}
