//! Rate-limited discard sink with batched capacity acquisition.
//!
//! A [`DiscardSink`] accepts writes without storing them. Every write is
//! charged against an ordered [`LimiterChain`], an optional [`SharedQuota`]
//! of bytes, and optional caller-owned [`Counter`]s. Use it to pace
//! or cap traffic that is consumed for its side effects only, such as
//! draining a response body, benchmarking a link, or enforcing a per-tenant
//! transfer budget.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rate_guard_discard::{ChainBuilder, Counter, DiscardConfig, DiscardSink, Limiter};
//! use rate_guard_discard::rate_limiters::TokenBucketLimiter;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let global: Arc<dyn Limiter> = Arc::new(TokenBucketLimiter::new(256 * 1024, Duration::from_millis(1), 200));
//! let user: Arc<dyn Limiter> = Arc::new(TokenBucketLimiter::new(128 * 1024, Duration::from_millis(1), 50));
//!
//! let limiters = ChainBuilder::new()
//!     .add("global", Some(global))
//!     .add("user", Some(user))
//!     .build();
//!
//! let bytes = Counter::new();
//! let sink = DiscardSink::new(limiters, DiscardConfig::new().with_bytes_counter(bytes.clone()));
//!
//! let accepted = sink.write(b"Hello, Rate Limited World!").await.unwrap();
//! assert_eq!(accepted, 26);
//! assert_eq!(bytes.get(), 26);
//! # }
//! ```
//!
//! # Core Concepts
//!
//! ## Batches
//! The sink asks its limiters for capacity in batches of
//! [`DiscardConfig::batch_size`] (64 KiB by default) and serves writes from
//! the locally held remainder until it runs short.
//!
//! ## Quota
//! A [`SharedQuota`] caps the total bytes accepted across every sink sharing
//! it. A write larger than what is left is truncated; once nothing is left
//! every write fails with [`DiscardError::QuotaExhausted`].
//!
//! ## Error Handling
//! Writes return [`DiscardResult`], which can indicate:
//! - **[`Cancelled`](DiscardError::Cancelled)** / **[`DeadlineExceeded`](DiscardError::DeadlineExceeded)** - the
//!   [`Cancellation`] fired; always wins over limiter failures
//! - **[`QuotaExhausted`](DiscardError::QuotaExhausted)** - terminal end of the quota
//! - **[`Limiter`](DiscardError::Limiter)** - every limiter in the chain refused; carries the last refusal
//!
//! A single limiter refusing is not an error as long as another limiter in
//! the chain grants the batch.
//!
//! ## Thread Safety
//! Sinks, quotas, counters and limiters are `Send + Sync`. Writes take
//! `&self` and may run concurrently on one sink.

pub mod batch;
pub mod cancel;
pub mod chain;
pub mod copy;
pub mod error;
pub mod limiter;
pub mod quota;
pub mod rate_limiters;
pub mod sink;
pub mod stats;

pub use cancel::{CancelReason, Cancellation};
pub use chain::{chain, chain_with_names, ChainBuilder, ChainEntry, LimiterChain, NamedLimiter};
pub use copy::{copy, copy_n, copy_n_with_rate_limit, copy_with_rate_limit, CopyOutcome};
pub use error::{DiscardError, DiscardResult, LimiterError, WaitResult};
pub use limiter::Limiter;
pub use quota::{QuotaReservation, SharedQuota};
pub use sink::{DiscardConfig, DiscardSink, DEFAULT_BATCH_SIZE};
pub use stats::Counter;
