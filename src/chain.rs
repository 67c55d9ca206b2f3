//! Ordered limiter chains and their construction helpers.
//!
//! A [`LimiterChain`] is applied front-to-back on every batch request. The
//! helpers here only assemble the sequence: absent entries are dropped and the
//! order of the remaining ones is preserved.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rate_guard_discard::{ChainBuilder, Limiter};
//! use rate_guard_discard::rate_limiters::TokenBucketLimiter;
//!
//! let tier1: Arc<dyn Limiter> = Arc::new(TokenBucketLimiter::new(1024, Duration::from_millis(1), 64));
//! let tier2: Arc<dyn Limiter> = Arc::new(TokenBucketLimiter::new(512, Duration::from_millis(1), 32));
//!
//! let (limiters, names) = ChainBuilder::new()
//!     .add("tier1", Some(tier1))
//!     .add("disabled", None)
//!     .add("tier2", Some(tier2))
//!     .build_with_names();
//!
//! assert_eq!(limiters.len(), 2);
//! assert_eq!(names, vec!["tier1", "tier2"]);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::limiter::Limiter;

/// One retained entry of a [`LimiterChain`].
#[derive(Clone)]
pub struct ChainEntry {
    name: Option<String>,
    limiter: Arc<dyn Limiter>,
}

impl ChainEntry {
    /// Diagnostic label, if the entry was added by name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The shared limiter handle.
    pub fn limiter(&self) -> &Arc<dyn Limiter> {
        &self.limiter
    }
}

impl fmt::Debug for ChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainEntry").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Ordered sequence of limiters. An empty chain imposes no limit.
///
/// Limiters are shared handles; the chain never owns their lifetime
/// exclusively, so the same limiter can appear in many chains.
#[derive(Clone, Default, Debug)]
pub struct LimiterChain {
    entries: Vec<ChainEntry>,
}

impl LimiterChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of limiters in the chain.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the chain holds no limiters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in application order.
    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    /// Limiters in application order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Limiter>> + '_ {
        self.entries.iter().map(|entry| &entry.limiter)
    }

    fn push(&mut self, name: Option<String>, limiter: Arc<dyn Limiter>) {
        self.entries.push(ChainEntry { name, limiter });
    }
}

impl FromIterator<Arc<dyn Limiter>> for LimiterChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Limiter>>>(iter: I) -> Self {
        chain(iter.into_iter().map(Some))
    }
}

/// Builds a chain from optional limiters, skipping the absent ones.
///
/// Common shapes:
///   - single tier: `chain([Some(primary)])`
///   - tiered: `chain([Some(global), Some(service), Some(user)])`
///   - feature-flagged tiers: pass `None` for disabled tiers
pub fn chain<I>(limiters: I) -> LimiterChain
where
    I: IntoIterator<Item = Option<Arc<dyn Limiter>>>,
{
    let mut result = LimiterChain::new();
    for limiter in limiters.into_iter().flatten() {
        result.push(None, limiter);
    }
    result
}

/// A limiter paired with a label for diagnostics.
#[derive(Clone)]
pub struct NamedLimiter {
    pub name: String,
    pub limiter: Option<Arc<dyn Limiter>>,
}

impl NamedLimiter {
    /// Pairs `limiter` with `name`. `None` marks an absent limiter.
    pub fn new(name: impl Into<String>, limiter: Option<Arc<dyn Limiter>>) -> Self {
        Self {
            name: name.into(),
            limiter,
        }
    }
}

impl fmt::Debug for NamedLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedLimiter")
            .field("name", &self.name)
            .field("present", &self.limiter.is_some())
            .finish()
    }
}

/// Builds a chain from named limiters, skipping entries without a limiter.
/// The names are kept on the chain and show up in the sink's log events.
pub fn chain_with_names<I>(named_limiters: I) -> LimiterChain
where
    I: IntoIterator<Item = NamedLimiter>,
{
    let mut result = LimiterChain::new();
    for named in named_limiters {
        if let Some(limiter) = named.limiter {
            result.push(Some(named.name), limiter);
        }
    }
    result
}

/// Incremental chain construction by name.
#[derive(Default, Debug)]
pub struct ChainBuilder {
    limiters: Vec<NamedLimiter>,
}

impl ChainBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a named limiter. `None` is accepted and dropped.
    pub fn add(mut self, name: impl Into<String>, limiter: Option<Arc<dyn Limiter>>) -> Self {
        if limiter.is_some() {
            self.limiters.push(NamedLimiter::new(name, limiter));
        }
        self
    }

    /// Finishes the chain.
    pub fn build(self) -> LimiterChain {
        chain_with_names(self.limiters)
    }

    /// Finishes the chain and also returns the retained names, in chain order.
    pub fn build_with_names(self) -> (LimiterChain, Vec<String>) {
        let names = self.limiters.iter().map(|named| named.name.clone()).collect();
        (self.build(), names)
    }
}
