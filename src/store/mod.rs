//! Counter stores: per-key usage tracking and atomic admission.
//!
//! The store owns all mutable state in the engine. Limiters compute
//! [`WindowBounds`] from their clock and policy; stores compare, persist,
//! and increment. Two implementations share one contract:
//! [`LocalCounterStore`] for process-local counters with no I/O, and
//! [`RedisCounterStore`] for counters shared across processes.

mod local;
mod remote;

pub use local::LocalCounterStore;
pub use remote::{RedisCounterStore, RedisStoreConfig};

use async_trait::async_trait;

use crate::error::Result;
use crate::throttle::StorageKey;

/// Boundaries of the window or period a counter currently lives in.
///
/// `index` is a monotonically increasing ordinal: `floor(now / window)` for
/// fixed windows, or a calendar ordinal (days from CE, months from year 0)
/// for quotas. It advances by at least one at every boundary, which is what
/// lets a store detect rollover with a single ordered comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    /// Ordinal of the active window or period.
    pub index: i64,
    /// Epoch second at which the next window or period begins.
    pub reset_epoch: i64,
}

/// Outcome of an atomic conditional increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request is within the limit; the counter now reads `count`.
    Admitted {
        /// Post-increment usage count.
        count: u64,
    },
    /// The limit was already spent for this window. The increment that
    /// triggered rejection is still recorded, so the stored count may sit
    /// above the limit by the margin of concurrent racers until the next
    /// reset.
    Rejected,
}

/// Per-key usage counters with atomic check-and-increment semantics.
///
/// Implementations must make `try_increment` a single atomic step as
/// observed by all callers of the same store: rollover check, conditional
/// reset, increment, and limit comparison may never interleave with another
/// caller's.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Roll the counter over if `bounds.index` is newer than the stored
    /// marker, increment it, and compare the result to `limit`.
    ///
    /// The rollover is idempotent: when several callers race across a
    /// boundary, exactly one reset takes effect.
    async fn try_increment(
        &self,
        key: &StorageKey,
        bounds: WindowBounds,
        limit: u64,
    ) -> Result<Admission>;

    /// Current count for the window described by `bounds`, without mutating.
    ///
    /// May lag concurrent writers; suitable for informational "remaining"
    /// queries, never as the basis for an admission decision.
    async fn peek(&self, key: &StorageKey, bounds: WindowBounds) -> Result<u64>;
}
