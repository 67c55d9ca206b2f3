//! Batched capacity acquisition.
//!
//! A sink does not ask its limiters for every write. It acquires a batch of
//! capacity from the whole chain, keeps it as local tokens, and draws writes
//! from that pool until it runs short.
//!
//! Local tokens are consumed with a compare-and-swap loop, so concurrent
//! writers can never draw more than was paid for. Refills are serialized by
//! an async mutex and re-check the pool after taking it, so two writers that
//! run short together pay for one batch, not two.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::cancel::Cancellation;
use crate::chain::LimiterChain;
use crate::error::{DiscardError, DiscardResult};

/// Requests `tokens` from every limiter in `chain`, front to back.
///
/// - A limiter that grants the request counts as a success.
/// - A refusal while `cancel` has fired aborts immediately with the
///   cancellation error. Remaining limiters are not consulted.
/// - Any other refusal skips that limiter.
///
/// Succeeds if at least one limiter granted the request, or if the chain is
/// empty. Fails with the last refusal when every limiter refused.
pub async fn acquire_batch(
    chain: &LimiterChain,
    tokens: u64,
    cancel: &Cancellation,
) -> DiscardResult<()> {
    let mut last_err = None;
    let mut granted = 0usize;

    for (index, entry) in chain.entries().iter().enumerate() {
        match entry.limiter().wait_n(tokens, cancel).await {
            Ok(()) => granted += 1,
            Err(err) => {
                if let Some(reason) = cancel.reason() {
                    tracing::debug!(index, limiter = entry.name(), ?reason, "batch acquisition cancelled");
                    return Err(reason.into());
                }
                tracing::debug!(index, limiter = entry.name(), error = %err, "skipping limiter");
                last_err = Some(err);
            }
        }
    }

    match last_err {
        Some(err) if granted == 0 => {
            tracing::warn!(limiters = chain.len(), tokens, error = %err, "every limiter refused the batch");
            Err(DiscardError::Limiter(err))
        }
        _ => Ok(()),
    }
}

/// Capacity already acquired from the chain but not yet consumed.
#[derive(Debug, Default)]
pub struct LocalTokens {
    available: AtomicU64,
    refill: Mutex<()>,
}

impl LocalTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens held right now.
    pub fn available(&self) -> u64 {
        self.available.load(Ordering::Acquire)
    }

    fn try_consume(&self, amount: u64) -> bool {
        let mut current = self.available.load(Ordering::Acquire);
        loop {
            if current < amount {
                return false;
            }
            match self.available.compare_exchange_weak(
                current,
                current - amount,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Draws `amount` tokens, acquiring a fresh batch of `batch_size` from
    /// `chain` when the pool is short.
    ///
    /// A refill replaces any leftover rather than adding to it. When
    /// `amount` exceeds `batch_size` the write is still admitted on one
    /// batch and the pool ends up empty.
    pub async fn consume(
        &self,
        amount: u64,
        batch_size: u64,
        chain: &LimiterChain,
        cancel: &Cancellation,
    ) -> DiscardResult<()> {
        if self.try_consume(amount) {
            return Ok(());
        }

        let _refill = tokio::select! {
            biased;
            reason = cancel.done() => return Err(reason.into()),
            guard = self.refill.lock() => guard,
        };

        // Another writer may have refilled while we waited for the lock.
        if self.try_consume(amount) {
            return Ok(());
        }

        if batch_size == 0 {
            return Err(DiscardError::QuotaExhausted);
        }

        acquire_batch(chain, batch_size, cancel).await?;
        tracing::trace!(batch_size, amount, "refilled local tokens");
        self.available
            .store(batch_size.saturating_sub(amount), Ordering::Release);
        Ok(())
    }
}
