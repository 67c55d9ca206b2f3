//! The rate-limited discard sink.

use crate::batch::LocalTokens;
use crate::cancel::Cancellation;
use crate::chain::LimiterChain;
use crate::error::{DiscardError, DiscardResult};
use crate::quota::{QuotaReservation, SharedQuota};
use crate::stats::Counter;

/// Default amount of capacity requested from the chain per batch (64 KiB).
pub const DEFAULT_BATCH_SIZE: u64 = 64 * 1024;

/// Configuration for a [`DiscardSink`].
///
/// Every field except `batch_size` is optional and off by default.
#[derive(Debug, Clone)]
pub struct DiscardConfig {
    /// Capacity requested from the chain per refill. Defaults to [`DEFAULT_BATCH_SIZE`].
    pub batch_size: u64,
    /// Shared byte budget. When set, writes are truncated to what is left.
    pub quota: Option<SharedQuota>,
    /// Incremented by the accepted byte count of every successful write.
    pub bytes_written: Option<Counter>,
    /// Incremented once per successful write.
    pub requests: Option<Counter>,
    /// Checked before every write and passed to every limiter wait.
    pub cancellation: Cancellation,
}

impl Default for DiscardConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            quota: None,
            bytes_written: None,
            requests: None,
            cancellation: Cancellation::default(),
        }
    }
}

impl DiscardConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capacity requested from the chain per refill.
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Charges writes against a shared quota.
    pub fn with_quota(mut self, quota: SharedQuota) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Counts accepted bytes into `counter`.
    pub fn with_bytes_counter(mut self, counter: Counter) -> Self {
        self.bytes_written = Some(counter);
        self
    }

    /// Counts successful writes into `counter`.
    pub fn with_request_counter(mut self, counter: Counter) -> Self {
        self.requests = Some(counter);
        self
    }

    /// Replaces the cancellation signal.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// A write target that stores nothing but charges every write against a
/// limiter chain and an optional shared quota.
///
/// Writes take `&self`; one sink can be shared between tasks (for example in
/// an `Arc`) without further synchronization.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use rate_guard_discard::{chain, Counter, DiscardConfig, DiscardSink, Limiter, SharedQuota};
/// use rate_guard_discard::rate_limiters::TokenBucketLimiter;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let bucket: Arc<dyn Limiter> = Arc::new(TokenBucketLimiter::new(4096, Duration::from_millis(1), 256));
/// let bytes = Counter::new();
/// let quota = SharedQuota::new(100);
///
/// let sink = DiscardSink::new(
///     chain([Some(bucket)]),
///     DiscardConfig::new()
///         .with_batch_size(1024)
///         .with_quota(quota.clone())
///         .with_bytes_counter(bytes.clone()),
/// );
///
/// assert_eq!(sink.write(&[0u8; 60]).await.unwrap(), 60);
/// assert_eq!(sink.write(&[0u8; 60]).await.unwrap(), 40);
/// assert!(sink.write(&[0u8; 60]).await.unwrap_err().is_end_of_stream());
/// assert_eq!(bytes.get(), 100);
/// # }
/// ```
#[derive(Debug)]
pub struct DiscardSink {
    limiters: LimiterChain,
    config: DiscardConfig,
    local_tokens: LocalTokens,
}

impl DiscardSink {
    /// Creates a sink over `limiters`.
    ///
    /// # Panics
    ///
    /// Panics if `config.batch_size` is zero.
    pub fn new(limiters: LimiterChain, config: DiscardConfig) -> Self {
        assert!(config.batch_size > 0, "batch_size must be greater than 0");
        Self {
            limiters,
            config,
            local_tokens: LocalTokens::new(),
        }
    }

    /// The chain every batch is requested from.
    pub fn limiters(&self) -> &LimiterChain {
        &self.limiters
    }

    /// The configuration the sink was built with.
    pub fn config(&self) -> &DiscardConfig {
        &self.config
    }

    /// Capacity acquired from the chain and not yet consumed by this sink.
    pub fn local_tokens(&self) -> u64 {
        self.local_tokens.available()
    }

    /// Discards `buf`, returning how many of its bytes were accepted.
    pub async fn write(&self, buf: &[u8]) -> DiscardResult<usize> {
        let accepted = self.write_len(buf.len() as u64).await?;
        // accepted <= buf.len(), so this never truncates
        Ok(accepted as usize)
    }

    /// Charges a write of `len` bytes.
    ///
    /// Returns the accepted byte count, which is `len` unless the shared quota
    /// truncated it. On error nothing was accepted and no statistics were
    /// touched; a quota reservation made by this call is refunded.
    ///
    /// # Errors
    /// * [`DiscardError::Cancelled`] / [`DiscardError::DeadlineExceeded`] - the
    ///   cancellation signal fired before or during the write
    /// * [`DiscardError::QuotaExhausted`] - the shared quota is used up; terminal
    /// * [`DiscardError::Limiter`] - every limiter in the chain refused the batch
    pub async fn write_len(&self, len: u64) -> DiscardResult<u64> {
        if len == 0 {
            return Ok(0);
        }

        if let Some(reason) = self.config.cancellation.reason() {
            return Err(reason.into());
        }

        let reservation = match &self.config.quota {
            Some(quota) => match quota.try_reserve(len) {
                Some(reservation) => Some(reservation),
                None => {
                    tracing::debug!(requested = len, "shared quota exhausted");
                    return Err(DiscardError::QuotaExhausted);
                }
            },
            None => None,
        };
        let accept = reservation.as_ref().map_or(len, QuotaReservation::amount);

        // Never acquire more capacity than the quota let through.
        let batch_size = if reservation.is_some() {
            self.config.batch_size.min(accept)
        } else {
            self.config.batch_size
        };

        // On error, or if this future is dropped while waiting, the
        // reservation goes out of scope and refunds itself.
        self.local_tokens
            .consume(accept, batch_size, &self.limiters, &self.config.cancellation)
            .await?;
        if let Some(reservation) = reservation {
            reservation.commit();
        }

        if let Some(requests) = &self.config.requests {
            requests.increment();
        }
        if let Some(bytes) = &self.config.bytes_written {
            bytes.add(accept);
        }

        if accept < len {
            tracing::trace!(requested = len, accepted = accept, "write truncated by quota");
        }
        Ok(accept)
    }
}
