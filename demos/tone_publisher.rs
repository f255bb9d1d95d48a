//! Publishes a sine tone to a relay, paced in real time
//!
//! Run with: cargo run --example tone_publisher [URL] [SECONDS]
//!
//!   cargo run --example tone_publisher                               # ws://127.0.0.1:9001/live, 10s
//!   cargo run --example tone_publisher ws://127.0.0.1:9001/live 30

use std::f32::consts::TAU;
use std::time::Duration;

use pcm_relay::client::{ClientConfig, RelayPublisher};
use pcm_relay::media::AudioChunk;
use pcm_relay::protocol::AudioFormat;
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: u32 = 48000;
const CHUNK_SAMPLES: usize = 2048;
const TONE_HZ: f32 = 440.0;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let url = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| "ws://127.0.0.1:9001/live".to_string());
    let seconds: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);

    let mut publisher = RelayPublisher::new(ClientConfig::new(url.clone()));
    publisher.connect().await?;
    println!("Publishing {}Hz tone to {} for {}s", TONE_HZ, url, seconds);

    let format = AudioFormat::mono(SAMPLE_RATE);
    let chunk_duration =
        Duration::from_secs_f64(CHUNK_SAMPLES as f64 / f64::from(SAMPLE_RATE));
    let total_chunks = (seconds as f64 / chunk_duration.as_secs_f64()).ceil() as u64;

    let mut ticker = tokio::time::interval(chunk_duration);
    let mut phase = 0.0f32;
    let step = TAU * TONE_HZ / SAMPLE_RATE as f32;

    for _ in 0..total_chunks {
        ticker.tick().await;

        let samples: Vec<f32> = (0..CHUNK_SAMPLES)
            .map(|_| {
                let s = phase.sin() * 0.5;
                phase = (phase + step) % TAU;
                s
            })
            .collect();

        publisher
            .send_chunk(&AudioChunk::from_samples(format.clone(), &samples))
            .await?;
    }

    println!(
        "Sent {} chunks, {} bytes",
        publisher.chunks_sent(),
        publisher.bytes_sent()
    );
    publisher.disconnect().await?;

    Ok(())
}
