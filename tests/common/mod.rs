#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rate_guard_discard::{Cancellation, Limiter, LimiterError, WaitResult};

/// Deterministic limiter that always answers the same way and records calls.
pub struct StaticLimiter {
    outcome: WaitResult,
    calls: AtomicUsize,
    requested: Mutex<Vec<u64>>,
}

impl StaticLimiter {
    pub fn granting() -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(()),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        })
    }

    pub fn refusing(err: LimiterError) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(err),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<u64> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Limiter for StaticLimiter {
    async fn wait_n(&self, tokens: u64, _cancel: &Cancellation) -> WaitResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(tokens);
        self.outcome.clone()
    }
}

/// Limiter that fires the caller's cancellation and then reports an
/// unrelated failure, as a limiter tripping over a torn-down connection would.
pub struct CancellingLimiter;

#[async_trait]
impl Limiter for CancellingLimiter {
    async fn wait_n(&self, _tokens: u64, cancel: &Cancellation) -> WaitResult {
        cancel.cancel();
        Err(LimiterError::unavailable("connection reset"))
    }
}

/// Limiter that never grants and only returns once the signal fires.
pub struct BlockingLimiter;

#[async_trait]
impl Limiter for BlockingLimiter {
    async fn wait_n(&self, _tokens: u64, cancel: &Cancellation) -> WaitResult {
        Err(cancel.done().await.into())
    }
}

pub fn dyn_limiter<L: Limiter + 'static>(limiter: &Arc<L>) -> Arc<dyn Limiter> {
    limiter.clone()
}
