use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use crate::cancel::Cancellation;
use crate::error::{LimiterError, WaitResult};
use crate::limiter::Limiter;

/// Token bucket limiter with an async, cancellable wait.
///
/// The bucket maintains a pool of tokens that is periodically refilled at a
/// constant rate. Each wait consumes tokens from the pool; when too few are
/// available the caller sleeps until enough refill events have happened.
/// This allows burst traffic up to the bucket capacity while maintaining an
/// average rate equal to the refill rate.
///
/// # Algorithm Behavior
///
/// - The bucket starts full with `capacity` tokens
/// - Every `refill_interval`, `refill_amount` tokens are added, up to the capacity
/// - A request larger than `capacity` can never succeed and fails immediately
///   with [`LimiterError::BeyondCapacity`]
/// - Time is measured in millisecond ticks since the limiter was created
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use rate_guard_discard::rate_limiters::TokenBucketLimiter;
///
/// // Capacity 64 KiB, refilling 16 KiB every second
/// let bucket = TokenBucketLimiter::new(64 * 1024, Duration::from_secs(1), 16 * 1024);
///
/// assert!(bucket.try_acquire(64 * 1024));
/// assert!(!bucket.try_acquire(1));
/// ```
#[derive(Debug)]
pub struct TokenBucketLimiter {
    /// Maximum number of tokens the bucket can hold
    capacity: u64,
    /// Number of ticks between each refill event
    refill_interval: u64,
    /// Number of tokens added in each refill event
    refill_amount: u64,
    /// Tick zero
    origin: Instant,
    state: Mutex<TokenBucketState>,
}

#[derive(Debug)]
struct TokenBucketState {
    /// Current number of tokens available in the bucket
    available: u64,
    /// Tick when the last refill occurred
    last_refill_tick: u64,
}

/// Outcome of a single admission attempt.
enum Admission {
    Granted,
    RetryAfter { ticks: u64 },
}

impl TokenBucketLimiter {
    /// Creates a new token bucket.
    ///
    /// # Parameters
    ///
    /// * `capacity` - Maximum number of tokens the bucket can hold
    /// * `refill_interval` - Time between refill events, at millisecond resolution
    /// * `refill_amount` - Number of tokens added per refill event
    ///
    /// # Panics
    ///
    /// Panics if `capacity` or `refill_amount` is zero, or if `refill_interval`
    /// is shorter than one millisecond.
    pub fn new(capacity: u64, refill_interval: Duration, refill_amount: u64) -> Self {
        let refill_interval = refill_interval.as_millis().min(u64::MAX as u128) as u64;
        assert!(capacity > 0, "capacity must be greater than 0");
        assert!(refill_interval > 0, "refill_interval must be at least 1ms");
        assert!(refill_amount > 0, "refill_amount must be greater than 0");

        TokenBucketLimiter {
            capacity,
            refill_interval,
            refill_amount,
            origin: Instant::now(),
            state: Mutex::new(TokenBucketState {
                available: capacity, // Bucket starts full
                last_refill_tick: 0,
            }),
        }
    }

    /// Maximum number of tokens the bucket can hold.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Takes `tokens` if they are available right now. Never waits.
    pub fn try_acquire(&self, tokens: u64) -> bool {
        if tokens > self.capacity {
            return false;
        }
        matches!(self.admit(tokens), Admission::Granted)
    }

    /// Number of tokens currently available, after applying pending refills.
    pub fn tokens_available(&self) -> u64 {
        let tick = self.current_tick();
        let mut state = self.lock_state();
        self.refill(&mut state, tick);
        state.available
    }

    fn current_tick(&self) -> u64 {
        self.origin.elapsed().as_millis().min(u64::MAX as u128) as u64
    }

    fn lock_state(&self) -> MutexGuard<'_, TokenBucketState> {
        // The state is plain integers, so it is consistent even after a panic.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn refill(&self, state: &mut TokenBucketState, tick: u64) {
        // Ticks come from a monotonic clock, but a caller that read the tick
        // before another caller took the lock may still be behind.
        if tick <= state.last_refill_tick {
            return;
        }
        let elapsed_ticks = tick - state.last_refill_tick;
        let refill_times = elapsed_ticks / self.refill_interval;
        if refill_times == 0 {
            return;
        }
        let total_refilled = refill_times.saturating_mul(self.refill_amount);
        state.available = state.available.saturating_add(total_refilled).min(self.capacity);
        state.last_refill_tick += refill_times * self.refill_interval;
    }

    fn admit(&self, tokens: u64) -> Admission {
        if tokens == 0 {
            return Admission::Granted;
        }

        let tick = self.current_tick();
        let mut state = self.lock_state();
        self.refill(&mut state, tick);

        if tokens <= state.available {
            state.available -= tokens;
            return Admission::Granted;
        }

        let needed_tokens = tokens - state.available;
        let refills = needed_tokens / self.refill_amount
            + u64::from(needed_tokens % self.refill_amount != 0);
        let next_refill_tick = state
            .last_refill_tick
            .saturating_add(refills.saturating_mul(self.refill_interval));
        Admission::RetryAfter {
            ticks: next_refill_tick.saturating_sub(tick).max(1),
        }
    }
}

#[async_trait]
impl Limiter for TokenBucketLimiter {
    async fn wait_n(&self, tokens: u64, cancel: &Cancellation) -> WaitResult {
        if tokens > self.capacity {
            return Err(LimiterError::BeyondCapacity {
                acquiring: tokens,
                capacity: self.capacity,
            });
        }

        loop {
            if let Some(reason) = cancel.reason() {
                return Err(reason.into());
            }

            match self.admit(tokens) {
                Admission::Granted => return Ok(()),
                Admission::RetryAfter { ticks } => {
                    tracing::trace!(tokens, retry_after_ms = ticks, "token bucket waiting for refill");
                    tokio::select! {
                        reason = cancel.done() => return Err(reason.into()),
                        _ = sleep(Duration::from_millis(ticks)) => {}
                    }
                }
            }
        }
    }
}

/// Configuration structure for creating a [`TokenBucketLimiter`].
#[derive(Debug, Clone)]
pub struct TokenBucketConfig {
    /// Maximum number of tokens the bucket can hold.
    pub capacity: u64,
    /// Time between refill events.
    pub refill_interval: Duration,
    /// Number of tokens added per interval.
    pub refill_amount: u64,
}

impl TokenBucketConfig {
    /// Creates a new configuration instance.
    pub fn new(capacity: u64, refill_interval: Duration, refill_amount: u64) -> Self {
        Self {
            capacity,
            refill_interval,
            refill_amount,
        }
    }
}

impl From<TokenBucketConfig> for TokenBucketLimiter {
    /// Converts a [`TokenBucketConfig`] into a [`TokenBucketLimiter`].
    ///
    /// # Panics
    /// Panics under the same conditions as [`TokenBucketLimiter::new`].
    ///
    /// ```
    /// use std::time::Duration;
    /// use rate_guard_discard::rate_limiters::{TokenBucketConfig, TokenBucketLimiter};
    ///
    /// let limiter: TokenBucketLimiter = TokenBucketConfig {
    ///     capacity: 100,
    ///     refill_interval: Duration::from_millis(10),
    ///     refill_amount: 5,
    /// }.into();
    /// assert_eq!(limiter.capacity(), 100);
    /// ```
    fn from(config: TokenBucketConfig) -> Self {
        TokenBucketLimiter::new(config.capacity, config.refill_interval, config.refill_amount)
    }
}
