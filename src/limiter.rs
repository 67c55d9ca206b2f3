//! Core trait for limiter capabilities.
//!
//! This module defines the single operation every limiter exposes to the sink.
//! It allows token buckets, remote admission services, and test doubles to be
//! mixed freely inside one [`LimiterChain`](crate::LimiterChain).

use async_trait::async_trait;

use crate::cancel::Cancellation;
use crate::error::WaitResult;

/// The capability to grant `tokens` units of capacity, possibly after waiting.
///
/// Implementations must be safe to call from many tasks at once and must
/// return promptly once `cancel` fires, reporting
/// [`LimiterError::Cancelled`](crate::LimiterError::Cancelled) or
/// [`LimiterError::DeadlineExceeded`](crate::LimiterError::DeadlineExceeded).
#[async_trait]
pub trait Limiter: Send + Sync {
    /// Waits until `tokens` units are available and consumes them.
    ///
    /// # Arguments
    /// * `tokens` - Number of units to acquire
    /// * `cancel` - Ambient cancellation signal of the calling sink
    ///
    /// # Returns
    /// * `Ok(())` once the units have been granted
    /// * `Err(LimiterError)` if the wait was cancelled or the limiter refused
    async fn wait_n(&self, tokens: u64, cancel: &Cancellation) -> WaitResult;
}
