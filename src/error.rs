//! error.rs
//! Defines the limiter-level and sink-level error/result types.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::cancel::CancelReason;

/// Error reported by a single [`Limiter`](crate::Limiter) wait.
///
/// Only the cancellation variants are fatal to a batch acquisition. Every
/// other variant is absorbed while at least one limiter in the chain grants
/// the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimiterError {
    /// The ambient cancellation signal was triggered while waiting.
    #[error("wait cancelled")]
    Cancelled,
    /// The ambient deadline passed while waiting.
    #[error("wait deadline exceeded")]
    DeadlineExceeded,
    /// Request permanently exceeds the configured capacity of the limiter.
    #[error("request exceeds maximum capacity: tried to acquire {acquiring}, capacity {capacity}")]
    BeyondCapacity { acquiring: u64, capacity: u64 },
    /// The limiter could not serve the request for an implementation specific reason.
    #[error("limiter unavailable: {reason}")]
    Unavailable { reason: String },
}

impl LimiterError {
    /// Returns `true` for the variants produced by a fired cancellation signal.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, LimiterError::Cancelled | LimiterError::DeadlineExceeded)
    }

    /// Shorthand for [`LimiterError::Unavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        LimiterError::Unavailable { reason: reason.into() }
    }
}

impl From<CancelReason> for LimiterError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Cancelled => LimiterError::Cancelled,
            CancelReason::DeadlineExceeded => LimiterError::DeadlineExceeded,
        }
    }
}

/// Result type for limiter waits.
pub type WaitResult = Result<(), LimiterError>;

/// Error returned by [`DiscardSink`](crate::DiscardSink) writes and the copy helpers.
#[derive(Debug, Clone, Error)]
pub enum DiscardError {
    /// The sink's cancellation signal was triggered.
    #[error("operation cancelled")]
    Cancelled,
    /// The sink's deadline passed.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
    /// The shared quota is used up. No further capacity will be granted.
    #[error("shared quota exhausted")]
    QuotaExhausted,
    /// Every limiter in the chain refused the batch; carries the last refusal.
    #[error(transparent)]
    Limiter(#[from] LimiterError),
    /// Reading from the copy source failed.
    #[error("source read failed: {0}")]
    Io(#[source] Arc<io::Error>),
    /// The copy source ended before the requested number of bytes was copied.
    #[error("source ended early: copied {copied} of {expected} bytes")]
    ShortCopy { expected: u64, copied: u64 },
}

impl DiscardError {
    /// Returns `true` when the error marks the terminal end of the sink's budget.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, DiscardError::QuotaExhausted)
    }

    /// Returns `true` for cancellation and deadline errors.
    pub fn is_cancellation(&self) -> bool {
        match self {
            DiscardError::Cancelled | DiscardError::DeadlineExceeded => true,
            DiscardError::Limiter(e) => e.is_cancellation(),
            _ => false,
        }
    }
}

impl From<CancelReason> for DiscardError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Cancelled => DiscardError::Cancelled,
            CancelReason::DeadlineExceeded => DiscardError::DeadlineExceeded,
        }
    }
}

impl From<io::Error> for DiscardError {
    fn from(err: io::Error) -> Self {
        DiscardError::Io(Arc::new(err))
    }
}

/// Result type for sink operations.
pub type DiscardResult<T> = Result<T, DiscardError>;
