use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use median_core::{measure_time, process, MedianFinder, StopSignal, StreamError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tokio::sync::{mpsc, Mutex};

/// Load settings, read from `MEDIAN_CLIENT_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
struct ClientConfig {
    #[serde(default = "default_streams")]
    streams: usize,
    #[serde(default = "default_values_per_stream")]
    values_per_stream: u64,
    #[serde(default = "default_channel_capacity")]
    channel_capacity: usize,
    #[serde(default)]
    deadline_secs: Option<u64>,
}

fn default_streams() -> usize {
    8
}

fn default_values_per_stream() -> u64 {
    10_000
}

fn default_channel_capacity() -> usize {
    64
}

/// How one stream ended.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StreamSummary {
    count: u64,
    median: f64,
    outcome: Result<(), StreamError>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = tracing_subscriber::FmtSubscriber::new();
    tracing::subscriber::set_global_default(subscriber)?;

    dotenv::dotenv().ok();
    let mut config: ClientConfig = envy::prefixed("MEDIAN_CLIENT_").from_env()?;
    config.channel_capacity = config.channel_capacity.max(1);

    let stop = match config.deadline_secs {
        Some(secs) => StopSignal::with_timeout(Duration::from_secs(secs)),
        None => StopSignal::new(),
    };
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.cancel();
            }
        });
    }

    let (summaries, elapsed) = measure_time!("all streams", { run_streams(&config, &stop).await? });

    for (stream, summary) in summaries.iter() {
        println!(
            "stream {}: count={} median={} outcome={:?}",
            stream, summary.count, summary.median, summary.outcome
        );
    }
    println!("Final stream summaries: {} streams in {:?}", summaries.len(), elapsed);

    Ok(())
}

/// Runs `config.streams` independent streams, each with its own engine.
async fn run_streams(
    config: &ClientConfig,
    stop: &StopSignal,
) -> Result<BTreeMap<usize, StreamSummary>, tokio::task::JoinError> {
    let summaries = Arc::new(Mutex::new(BTreeMap::new()));
    let mut handles = vec![];

    for stream in 0..config.streams {
        let summaries = Arc::clone(&summaries);
        let stop = stop.clone();
        let values = config.values_per_stream;
        let capacity = config.channel_capacity;

        let handle = tokio::spawn(async move {
            let (input_tx, input_rx) = mpsc::channel(capacity);
            let (output_tx, mut output_rx) = mpsc::channel(capacity);

            tokio::spawn(async move {
                let mut rng = StdRng::seed_from_u64(stream as u64);
                for _ in 0..values {
                    if input_tx.send(rng.gen_range(-1_000_000..=1_000_000i64)).await.is_err() {
                        return;
                    }
                }
            });

            let drain = tokio::spawn(async move {
                let mut published = 0u64;
                while output_rx.recv().await.is_some() {
                    published += 1;
                    if published % 1000 == 0 {
                        tracing::debug!(stream, published, "Medians received");
                    }
                }
                published
            });

            let mut finder = MedianFinder::new();
            let outcome = process(&stop, &mut finder, input_rx, Some(output_tx)).await;
            let published = drain.await.unwrap_or_default();
            tracing::info!(stream, published, count = finder.count(), "Stream finished");

            summaries.lock().await.insert(
                stream,
                StreamSummary {
                    count: finder.count(),
                    median: finder.median(),
                    outcome,
                },
            );
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.await?;
    }

    let summaries = summaries.lock().await;
    Ok(summaries.clone())
}
