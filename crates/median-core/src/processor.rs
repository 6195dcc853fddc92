use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::error::StreamError;
use crate::medianfinder::RunningMedian;
use crate::stop::StopSignal;

/// Feeds every value from `input` into `engine` and, when `output` is given,
/// publishes the median so far after each insertion.
///
/// Returns `Ok(())` once `input` is closed and drained. Returns the stop
/// reason as soon as `stop` fires, whether the loop is waiting for input or
/// for room in `output`; a signal that fired before the call wins over any
/// buffered input. Values consumed before that stay in the engine.
///
/// The `output` sender is dropped before returning on every path, so the
/// receiver sees end-of-stream once no other clones of the sender remain.
/// If the receiver goes away mid-run, publishing stops and the remaining
/// input is still fed into the engine.
pub async fn process<R>(
    stop: &StopSignal,
    mut engine: R,
    mut input: mpsc::Receiver<R::Value>,
    mut output: Option<mpsc::Sender<f64>>,
) -> Result<(), StreamError>
where
    R: RunningMedian,
{
    debug!(emit = output.is_some(), "Stream processing started");

    loop {
        let next = tokio::select! {
            biased;
            reason = stop.cancelled() => {
                info!(%reason, count = engine.count(), "Stream processing stopped");
                return Err(reason);
            }
            next = input.recv() => next,
        };

        let Some(value) = next else {
            info!(
                count = engine.count(),
                median = engine.median(),
                "Input exhausted, stream processing completed"
            );
            return Ok(());
        };

        engine.insert(value);
        trace!(?value, count = engine.count(), "Inserted value");

        if let Some(sink) = output.as_ref() {
            let median = engine.median();
            let delivered = tokio::select! {
                biased;
                reason = stop.cancelled() => {
                    info!(%reason, count = engine.count(), "Stream processing stopped while publishing");
                    return Err(reason);
                }
                sent = sink.send(median) => sent.is_ok(),
            };
            if !delivered {
                warn!(count = engine.count(), "Median receiver dropped, no longer publishing");
                output = None;
            }
        }
    }
}
