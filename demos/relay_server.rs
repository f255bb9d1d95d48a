//! Live PCM relay server
//!
//! Run with: cargo run --example relay_server [BIND_ADDR] [echo]
//!
//! Examples:
//!   cargo run --example relay_server                    # relay on 0.0.0.0:9001
//!   cargo run --example relay_server 127.0.0.1:9002     # relay on 127.0.0.1:9002
//!   cargo run --example relay_server 0.0.0.0:9001 echo  # echo every message back
//!
//! ## Publishing
//!
//! Connect a WebSocket to any path without "get", e.g. ws://localhost:9001/live,
//! or run the tone publisher:
//!   cargo run --example tone_publisher ws://localhost:9001/live
//!
//! ## Subscribing
//!
//! Connect a WebSocket to a path containing "get", e.g. ws://localhost:9001/get.
//! Every binary message is a header block followed by raw f32 PCM.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pcm_relay::{RelayServer, ServerConfig, ServerMode};
use tracing_subscriber::EnvFilter;

fn parse_bind_addr(arg: &str) -> Option<SocketAddr> {
    if arg == "localhost" {
        return "127.0.0.1:9001".parse().ok();
    }
    arg.parse().ok()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = ServerConfig::default();
    if let Some(arg) = args.get(1) {
        match parse_bind_addr(arg) {
            Some(addr) => config = config.bind(addr),
            None => {
                eprintln!("Invalid bind address: {}", arg);
                std::process::exit(1);
            }
        }
    }
    if args.get(2).map(String::as_str) == Some("echo") {
        config = config.mode(ServerMode::Echo);
    }

    println!("Relay listening on ws://{} ({:?} mode)", config.bind_addr, config.mode);

    let server = Arc::new(RelayServer::new(config));

    // Periodic stats
    let stats_server = Arc::clone(&server);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(10));
        loop {
            ticker.tick().await;
            let relay = stats_server.registry().stats().await;
            let conns = stats_server.stats();
            tracing::info!(
                connections = conns.active_connections,
                subscribers = relay.subscriber_count,
                publisher = ?relay.publisher_id,
                frames = relay.frames_broadcast,
                bytes = relay.bytes_broadcast,
                "Relay stats"
            );
        }
    });

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
