mod config;

use std::io::BufRead;
use std::thread;
use std::time::Duration;

use median_core::{measure_time, process, SharedMedianFinder, StopSignal, StreamError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, oneshot};
use tokio::task;
use tokio::time::interval;

use crate::config::{Config, Source};

const RANDOM_RANGE: std::ops::RangeInclusive<i64> = -1000..=1000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the medians, logs go to stderr.
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_env()?;
    tracing::info!(?config, "Starting the median stream");

    let stop = match config.deadline_secs {
        Some(secs) => StopSignal::with_timeout(Duration::from_secs(secs)),
        None => StopSignal::new(),
    };
    let finder = SharedMedianFinder::<i64>::new();
    let (input_tx, input_rx) = mpsc::channel(config.channel_capacity);
    let (output_tx, mut output_rx) = mpsc::channel(config.channel_capacity);
    let output = config.emit_medians.then_some(output_tx);

    match config.source {
        Source::Stdin => feed_stdin(input_tx),
        Source::Random => {
            task::spawn(feed_random(input_tx, config.random_count, config.random_seed));
        }
    }
    task::spawn(watch_ctrl_c(stop.clone()));
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let reporter = task::spawn(report_progress(
        shutdown_rx,
        finder.clone(),
        Duration::from_secs(config.report_interval_secs),
    ));

    let processor = {
        let stop = stop.clone();
        let finder = finder.clone();
        task::spawn(async move {
            measure_time!("process", { process(&stop, finder, input_rx, output).await })
        })
    };

    let mut stdout = BufWriter::new(tokio::io::stdout());
    while let Some(median) = output_rx.recv().await {
        stdout.write_all(format!("{median}\n").as_bytes()).await?;
    }
    stdout.flush().await?;

    let (result, elapsed) = processor.await?;
    // The reporter may already be gone, nothing to do then.
    let _ = shutdown_tx.send(());
    reporter.await?;

    match result {
        Ok(()) => {
            tracing::info!(
                count = finder.count(),
                median = finder.median(),
                ?elapsed,
                "Stream completed"
            );
            Ok(())
        }
        Err(StreamError::Cancelled) => {
            tracing::info!(count = finder.count(), median = finder.median(), "Stream cancelled");
            Ok(())
        }
        Err(error) => {
            tracing::error!(%error, count = finder.count(), "Stream stopped");
            Err(error.into())
        }
    }
}

/// Parses whitespace separated integers, skipping tokens that are not numbers.
fn parse_line(line: &str) -> Vec<i64> {
    line.split_whitespace()
        .filter_map(|token| match token.parse::<i64>() {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(token, %error, "Skipping malformed input");
                None
            }
        })
        .collect()
}

/// Reads stdin on a plain thread so a blocked read never holds up shutdown.
fn feed_stdin(input: mpsc::Sender<i64>) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(error) => {
                    tracing::error!(%error, "Failed to read stdin");
                    return;
                }
            };
            for value in parse_line(&line) {
                if input.blocking_send(value).is_err() {
                    return;
                }
            }
        }
        tracing::debug!("Stdin closed");
    });
}

async fn feed_random(input: mpsc::Sender<i64>, count: u64, seed: Option<u64>) {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    for _ in 0..count {
        let value = rng.gen_range(RANDOM_RANGE);
        if input.send(value).await.is_err() {
            return;
        }
    }
}

async fn watch_ctrl_c(stop: StopSignal) {
    tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                tracing::info!("Received Ctrl-C, cancelling the stream");
                stop.cancel();
            }
            Err(error) => tracing::error!(%error, "Unable to listen for Ctrl-C"),
        },
        _ = stop.cancelled() => {}
    }
}

async fn report_progress(
    mut shutdown_signal: oneshot::Receiver<()>,
    finder: SharedMedianFinder<i64>,
    period: Duration,
) {
    let mut interval = interval(period);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tracing::info!(count = finder.count(), median = finder.median(), "Running median");
            }
            _ = &mut shutdown_signal => {
                tracing::debug!("Progress reporter received shutdown signal");
                break;
            }
        }
    }
}
