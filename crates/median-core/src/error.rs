use thiserror::Error;

/// Reason a stream run stopped before its input was exhausted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    #[error("stream processing was cancelled")]
    Cancelled,
    #[error("stream processing deadline exceeded")]
    DeadlineExceeded,
}
