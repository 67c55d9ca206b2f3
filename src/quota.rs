//! Shared byte quota enforced across sinks.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Remaining-byte budget shared by any number of sinks and callers.
///
/// Cloning the handle shares the same counter. All mutation is lock-free:
/// reservations go through a compare-and-swap loop, refunds through an
/// atomic add. A successful reservation never drives the counter below zero.
#[derive(Debug, Clone)]
pub struct SharedQuota {
    remaining: Arc<AtomicI64>,
}

impl SharedQuota {
    /// Creates a quota with `bytes` still permitted.
    pub fn new(bytes: i64) -> Self {
        Self {
            remaining: Arc::new(AtomicI64::new(bytes)),
        }
    }

    /// Bytes still permitted. May be observed as zero, never negative after a reservation.
    pub fn remaining(&self) -> i64 {
        self.remaining.load(Ordering::Acquire)
    }

    /// Returns `true` once no further reservation can succeed.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() <= 0
    }

    /// Reserves up to `requested` bytes.
    ///
    /// Returns the reserved amount, which is `requested` truncated to what is
    /// left, or `None` if the quota is already exhausted. Concurrent
    /// modifications cause a retry, never a failure.
    pub fn reserve(&self, requested: u64) -> Option<u64> {
        let requested = i64::try_from(requested).unwrap_or(i64::MAX);
        let mut current = self.remaining.load(Ordering::Acquire);
        loop {
            if current <= 0 {
                return None;
            }
            let accept = requested.min(current);
            if accept <= 0 {
                return None;
            }
            match self.remaining.compare_exchange_weak(
                current,
                current - accept,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(accept as u64),
                Err(actual) => current = actual,
            }
        }
    }

    /// Like [`reserve`](Self::reserve), but returns a guard that refunds the
    /// reservation when dropped unless it is committed first.
    pub fn try_reserve(&self, requested: u64) -> Option<QuotaReservation> {
        self.reserve(requested).map(|amount| QuotaReservation {
            quota: self.clone(),
            amount,
            committed: false,
        })
    }

    /// Returns a previous reservation to the pool.
    pub fn refund(&self, amount: u64) {
        let amount = i64::try_from(amount).unwrap_or(i64::MAX);
        self.remaining.fetch_add(amount, Ordering::AcqRel);
    }

    /// Returns `true` if both handles share the same counter.
    pub fn ptr_eq(&self, other: &SharedQuota) -> bool {
        Arc::ptr_eq(&self.remaining, &other.remaining)
    }
}

/// RAII guard for bytes reserved from a [`SharedQuota`].
///
/// Dropping the guard returns the bytes to the quota. A write that ends
/// early, including one whose future is dropped mid-wait, therefore never
/// leaks its reservation.
#[derive(Debug)]
#[must_use = "dropping the reservation refunds it"]
pub struct QuotaReservation {
    quota: SharedQuota,
    amount: u64,
    committed: bool,
}

impl QuotaReservation {
    /// Bytes held by this reservation.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Keeps the bytes debited and returns the reserved amount.
    pub fn commit(mut self) -> u64 {
        self.committed = true;
        self.amount
    }
}

impl Drop for QuotaReservation {
    fn drop(&mut self) {
        if !self.committed {
            self.quota.refund(self.amount);
        }
    }
}
