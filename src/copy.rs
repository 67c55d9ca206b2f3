//! Bulk copy from an async source into a [`DiscardSink`].
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rate_guard_discard::{chain, copy_with_rate_limit, Counter, DiscardConfig, Limiter};
//! use rate_guard_discard::rate_limiters::TokenBucketLimiter;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bucket: Arc<dyn Limiter> = Arc::new(TokenBucketLimiter::new(64 * 1024, Duration::from_millis(1), 1024));
//! let bytes = Counter::new();
//! let mut source: &[u8] = b"Hello from rate limited copy!";
//!
//! let outcome = copy_with_rate_limit(
//!     &mut source,
//!     chain([Some(bucket)]),
//!     DiscardConfig::new().with_batch_size(1024).with_bytes_counter(bytes.clone()),
//! )
//! .await;
//!
//! assert_eq!(outcome.into_result().unwrap(), 29);
//! assert_eq!(bytes.get(), 29);
//! # }
//! ```

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::chain::LimiterChain;
use crate::error::{DiscardError, DiscardResult};
use crate::sink::{DiscardConfig, DiscardSink};

const COPY_BUFFER_SIZE: usize = 32 * 1024;

/// Result of a bulk copy: how much was accepted, and what stopped it.
#[derive(Debug)]
pub struct CopyOutcome {
    /// Bytes accepted by the sink before the copy ended.
    pub copied: u64,
    /// `None` when the copy ran to completion.
    pub error: Option<DiscardError>,
}

impl CopyOutcome {
    fn done(copied: u64) -> Self {
        Self { copied, error: None }
    }

    fn failed(copied: u64, error: DiscardError) -> Self {
        Self {
            copied,
            error: Some(error),
        }
    }

    /// Returns `true` when no error stopped the copy.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Drops the partial count on error.
    pub fn into_result(self) -> DiscardResult<u64> {
        match self.error {
            None => Ok(self.copied),
            Some(err) => Err(err),
        }
    }
}

/// Drives `sink` with everything `reader` yields until end of input or the
/// first error.
pub async fn copy<R>(reader: &mut R, sink: &DiscardSink) -> CopyOutcome
where
    R: AsyncRead + Unpin + ?Sized,
{
    drive(reader, sink, None).await
}

/// Drives `sink` with exactly `limit` bytes from `reader`.
///
/// If the source ends first, the outcome carries
/// [`DiscardError::ShortCopy`] along with the bytes that were copied.
pub async fn copy_n<R>(reader: &mut R, sink: &DiscardSink, limit: u64) -> CopyOutcome
where
    R: AsyncRead + Unpin + ?Sized,
{
    drive(reader, sink, Some(limit)).await
}

/// Builds a one-off sink from `limiters` and `config` and copies `reader` into it.
pub async fn copy_with_rate_limit<R>(
    reader: &mut R,
    limiters: LimiterChain,
    config: DiscardConfig,
) -> CopyOutcome
where
    R: AsyncRead + Unpin + ?Sized,
{
    let sink = DiscardSink::new(limiters, config);
    copy(reader, &sink).await
}

/// Builds a one-off sink from `limiters` and `config` and copies `limit`
/// bytes of `reader` into it.
pub async fn copy_n_with_rate_limit<R>(
    reader: &mut R,
    limit: u64,
    limiters: LimiterChain,
    config: DiscardConfig,
) -> CopyOutcome
where
    R: AsyncRead + Unpin + ?Sized,
{
    let sink = DiscardSink::new(limiters, config);
    copy_n(reader, &sink, limit).await
}

async fn drive<R>(reader: &mut R, sink: &DiscardSink, limit: Option<u64>) -> CopyOutcome
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied = 0u64;

    loop {
        let want = match limit {
            Some(limit) if copied >= limit => return CopyOutcome::done(copied),
            Some(limit) => (limit - copied).min(COPY_BUFFER_SIZE as u64) as usize,
            None => COPY_BUFFER_SIZE,
        };

        let read = match reader.read(&mut buf[..want]).await {
            Ok(0) => break,
            Ok(read) => read as u64,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return CopyOutcome::failed(copied, err.into()),
        };

        // A quota can accept part of a chunk; offer the rest until the sink
        // reports why it will not take more.
        let mut offset = 0;
        while offset < read {
            match sink.write_len(read - offset).await {
                Ok(accepted) => {
                    offset += accepted;
                    copied += accepted;
                }
                Err(err) => {
                    tracing::debug!(copied, error = %err, "copy stopped by sink");
                    return CopyOutcome::failed(copied, err);
                }
            }
        }
    }

    match limit {
        Some(expected) if copied < expected => {
            CopyOutcome::failed(copied, DiscardError::ShortCopy { expected, copied })
        }
        _ => CopyOutcome::done(copied),
    }
}
