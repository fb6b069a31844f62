//! In-process counter store.
//!
//! Counters live in a concurrent map of atomics; no locks are held across
//! an admission decision and nothing here performs I/O. State is scoped to
//! the process; replicas that must agree on one counter share a
//! [`RedisCounterStore`](super::RedisCounterStore) instead.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use crate::error::Result;
use crate::throttle::StorageKey;

use super::{Admission, CounterStore, WindowBounds};

/// One counter cell: the usage count plus the ordinal of the window it
/// belongs to.
#[derive(Debug)]
struct CounterCell {
    /// Ordinal of the window the count belongs to.
    window: AtomicI64,
    /// Usage within that window.
    count: AtomicU64,
}

impl CounterCell {
    fn new(index: i64) -> Self {
        Self {
            window: AtomicI64::new(index),
            count: AtomicU64::new(0),
        }
    }

    /// Advance the window marker if it is stale, resetting the count.
    ///
    /// The marker comparison uses strictly-less-than: whichever caller first
    /// observes the stale marker wins the CAS and performs the one reset;
    /// late racers see an up-to-date marker and fall through. A caller that
    /// loses the CAS to an even newer window also falls through, since its
    /// own window is already gone.
    fn roll_over(&self, index: i64) {
        let mut seen = self.window.load(Ordering::Acquire);
        while seen < index {
            match self
                .window
                .compare_exchange(seen, index, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    self.count.store(0, Ordering::Release);
                    return;
                }
                Err(actual) => seen = actual,
            }
        }
    }
}

/// Process-local counter store backed by a concurrent map of atomics.
///
/// Safe for unbounded concurrent callers; operations on the same key are
/// linearized by the per-cell atomics. Counters racing an increment against
/// a concurrent reset may overshoot the limit by at most the number of
/// racers at the boundary instant; the overshoot is bounded and clears at
/// the next rollover.
#[derive(Debug, Default)]
pub struct LocalCounterStore {
    counters: DashMap<String, Arc<CounterCell>>,
}

impl LocalCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &StorageKey, index: i64) -> Arc<CounterCell> {
        self.counters
            .entry(key.as_str().to_owned())
            .or_insert_with(|| Arc::new(CounterCell::new(index)))
            .clone()
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// True when no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Drop all counters. Primarily useful for tests.
    pub fn clear(&self) {
        self.counters.clear();
    }
}

#[async_trait]
impl CounterStore for LocalCounterStore {
    async fn try_increment(
        &self,
        key: &StorageKey,
        bounds: WindowBounds,
        limit: u64,
    ) -> Result<Admission> {
        let cell = self.cell(key, bounds.index);
        cell.roll_over(bounds.index);

        let count = cell.count.fetch_add(1, Ordering::AcqRel) + 1;
        if count > limit {
            trace!(key = %key, count, limit, "local counter over limit");
            Ok(Admission::Rejected)
        } else {
            Ok(Admission::Admitted { count })
        }
    }

    async fn peek(&self, key: &StorageKey, bounds: WindowBounds) -> Result<u64> {
        let count = match self.counters.get(key.as_str()) {
            Some(cell) if cell.window.load(Ordering::Acquire) >= bounds.index => {
                cell.count.load(Ordering::Acquire)
            }
            // Unknown key, or a counter left over from a previous window.
            _ => 0,
        };
        Ok(count)
    }
}
