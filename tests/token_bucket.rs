use std::time::Duration;

use rate_guard_discard::rate_limiters::{TokenBucketConfig, TokenBucketLimiter};
use rate_guard_discard::{Cancellation, Limiter, LimiterError};
use tokio::time::Instant;

fn new_token_bucket(capacity: u64, interval_ms: u64, amount: u64) -> TokenBucketLimiter {
    TokenBucketLimiter::new(capacity, Duration::from_millis(interval_ms), amount)
}

#[test]
#[should_panic(expected = "capacity must be greater than 0")]
fn zero_capacity_should_panic() {
    new_token_bucket(0, 10, 5);
}

#[test]
#[should_panic(expected = "refill_interval must be at least 1ms")]
fn sub_millisecond_interval_should_panic() {
    TokenBucketLimiter::new(100, Duration::from_micros(500), 5);
}

#[test]
#[should_panic(expected = "refill_amount must be greater than 0")]
fn zero_refill_amount_should_panic() {
    new_token_bucket(100, 10, 0);
}

#[test]
fn config_should_convert_into_limiter() {
    let limiter: TokenBucketLimiter = TokenBucketConfig::new(100, Duration::from_millis(10), 5).into();
    assert_eq!(limiter.capacity(), 100);
}

#[tokio::test(start_paused = true)]
async fn bucket_should_start_full() {
    let bucket = new_token_bucket(100, 10, 5);
    assert_eq!(bucket.tokens_available(), 100);
    assert!(bucket.try_acquire(100));
    assert!(!bucket.try_acquire(1));
    assert!(bucket.try_acquire(0));
}

#[tokio::test(start_paused = true)]
async fn try_acquire_beyond_capacity_should_fail() {
    let bucket = new_token_bucket(100, 10, 5);
    assert!(!bucket.try_acquire(101));
    assert_eq!(bucket.tokens_available(), 100);
}

#[tokio::test(start_paused = true)]
async fn huge_refill_amount_should_not_overflow_retry_delay() {
    let bucket = TokenBucketLimiter::new(u64::MAX, Duration::from_secs(1), u64::MAX);
    assert!(bucket.try_acquire(u64::MAX));
    assert!(!bucket.try_acquire(2));

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(bucket.try_acquire(2));
}

#[tokio::test(start_paused = true)]
async fn refill_should_follow_interval() {
    let bucket = new_token_bucket(100, 10, 5);
    assert!(bucket.try_acquire(100));

    tokio::time::advance(Duration::from_millis(5)).await;
    assert_eq!(bucket.tokens_available(), 0);

    tokio::time::advance(Duration::from_millis(5)).await;
    assert_eq!(bucket.tokens_available(), 5);

    tokio::time::advance(Duration::from_millis(25)).await;
    assert_eq!(bucket.tokens_available(), 15);

    // Refills are capped at capacity.
    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(bucket.tokens_available(), 100);
}

#[tokio::test(start_paused = true)]
async fn wait_should_return_immediately_when_tokens_are_available() {
    let bucket = new_token_bucket(100, 10, 5);
    let start = Instant::now();
    bucket.wait_n(60, &Cancellation::new()).await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(bucket.tokens_available(), 40);
}

#[tokio::test(start_paused = true)]
async fn wait_should_sleep_until_refilled() {
    let bucket = new_token_bucket(100, 10, 5);
    assert!(bucket.try_acquire(100));

    let start = Instant::now();
    bucket.wait_n(20, &Cancellation::new()).await.unwrap();

    // 20 tokens need four refills of 5, one every 10ms.
    assert!(start.elapsed() >= Duration::from_millis(40));
    assert!(start.elapsed() < Duration::from_millis(50));
    assert_eq!(bucket.tokens_available(), 0);
}

#[tokio::test(start_paused = true)]
async fn wait_beyond_capacity_should_fail_immediately() {
    let bucket = new_token_bucket(100, 10, 5);
    let err = bucket.wait_n(101, &Cancellation::new()).await.unwrap_err();
    assert_eq!(
        err,
        LimiterError::BeyondCapacity {
            acquiring: 101,
            capacity: 100
        }
    );
    assert!(!err.is_cancellation());
}

#[tokio::test(start_paused = true)]
async fn wait_should_honor_cancelled_signal() {
    let bucket = new_token_bucket(100, 10, 5);
    let cancel = Cancellation::new();
    cancel.cancel();

    let err = bucket.wait_n(1, &cancel).await.unwrap_err();
    assert_eq!(err, LimiterError::Cancelled);
    // Nothing was taken.
    assert_eq!(bucket.tokens_available(), 100);
}

#[tokio::test(start_paused = true)]
async fn deadline_should_interrupt_wait() {
    let bucket = new_token_bucket(100, 1000, 1);
    assert!(bucket.try_acquire(100));

    let cancel = Cancellation::new().with_timeout(Duration::from_millis(100));
    let start = Instant::now();
    let err = bucket.wait_n(50, &cancel).await.unwrap_err();

    assert_eq!(err, LimiterError::DeadlineExceeded);
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert!(start.elapsed() < Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn explicit_cancel_should_interrupt_wait() {
    let bucket = std::sync::Arc::new(new_token_bucket(10, 1000, 1));
    assert!(bucket.try_acquire(10));

    let cancel = Cancellation::new();
    let waiter = {
        let bucket = bucket.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { bucket.wait_n(5, &cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    assert_eq!(waiter.await.unwrap(), Err(LimiterError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn concurrent_waiters_should_not_overdraw() {
    let bucket = std::sync::Arc::new(new_token_bucket(10, 10, 10));
    let start = Instant::now();

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let bucket = bucket.clone();
            tokio::spawn(async move { bucket.wait_n(10, &Cancellation::new()).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // One full bucket up front, then four refills of 10.
    assert!(start.elapsed() >= Duration::from_millis(40));
}
