use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::StreamError;

/// Externally triggered, permanent stop request for a stream run.
///
/// A signal built with a deadline fires by itself once the deadline passes and
/// reports [`StreamError::DeadlineExceeded`]; an explicit [`StopSignal::cancel`]
/// reports [`StreamError::Cancelled`]. Whichever reason is recorded first is
/// kept. Clones observe and trigger the same signal.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<StreamError>>,
    deadline: Option<Instant>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.stop(StreamError::Cancelled);
    }

    fn stop(&self, reason: StreamError) {
        if self.reason.set(reason).is_ok() {
            tracing::debug!(%reason, "Stop signal fired");
        }
        self.token.cancel();
    }

    /// Why the signal fired, or `None` while it has not.
    pub fn reason(&self) -> Option<StreamError> {
        if let Some(reason) = self.reason.get() {
            return Some(*reason);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            self.stop(StreamError::DeadlineExceeded);
            return self.reason.get().copied();
        }
        None
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Resolves once the signal fires, immediately if it already has.
    pub async fn cancelled(&self) -> StreamError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = sleep_until(deadline) => self.stop(StreamError::DeadlineExceeded),
                }
            }
            None => self.token.cancelled().await,
        }
        self.reason.get().copied().unwrap_or(StreamError::Cancelled)
    }
}
