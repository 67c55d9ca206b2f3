//! Cancellation signal shared between a sink and the limiters it waits on.
//!
//! A [`Cancellation`] pairs an explicit [`CancellationToken`] with an optional
//! deadline, and reports which of the two ended the operation.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Why a [`Cancellation`] fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The token was cancelled explicitly.
    Cancelled,
    /// The deadline passed.
    DeadlineExceeded,
}

/// Cancellation signal observed by [`DiscardSink`](crate::DiscardSink) and
/// passed to every [`Limiter`](crate::Limiter) wait.
///
/// The default value never fires.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// Creates a signal that fires only when [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing token, typically a child of an application shutdown token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token, deadline: None }
    }

    /// Adds a deadline after which the signal reports [`CancelReason::DeadlineExceeded`].
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Adds a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The underlying token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The configured deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fires the signal for every clone sharing the token.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Non-blocking check. Explicit cancellation takes precedence over the deadline.
    pub fn reason(&self) -> Option<CancelReason> {
        if self.token.is_cancelled() {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Returns `true` once the signal has fired.
    pub fn is_done(&self) -> bool {
        self.reason().is_some()
    }

    /// Completes when the signal fires.
    pub async fn done(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => CancelReason::Cancelled,
                    _ = sleep_until(deadline) => CancelReason::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                CancelReason::Cancelled
            }
        }
    }
}
