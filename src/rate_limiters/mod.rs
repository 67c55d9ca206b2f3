//! Concrete [`Limiter`](crate::Limiter) implementations.
//!
//! # Available Limiters
//!
//! - **[`TokenBucketLimiter`]** - Allows bursts up to capacity while maintaining average rate
//!
//! Any other admission mechanism can join a chain by implementing
//! [`Limiter`](crate::Limiter) directly.

pub mod token_bucket;
pub use token_bucket::TokenBucketConfig;
pub use token_bucket::TokenBucketLimiter;
