//! Composition of rate limiting and quota tracking behind one contract.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::store::CounterStore;

use super::key::Identity;
use super::policy::{QuotaPolicy, RatePolicy};
use super::quota::QuotaTracker;
use super::rate::RateLimiter;

/// Coordinates a [`RateLimiter`] and a [`QuotaTracker`] over one store.
///
/// Policies are supplied per call, so a single coordinator serves
/// rate-limit-only, quota-only, and dual-protection callers alike. The rate
/// limit is always evaluated first (it is the cheaper check and the one
/// that resets soonest); the first fault short-circuits the rest.
///
/// The coordinator holds no mutable state. Any number of instances, in one
/// process or across replicas, may share a
/// [`RedisCounterStore`](crate::store::RedisCounterStore); a
/// [`LocalCounterStore`](crate::store::LocalCounterStore) must stay within
/// one process.
#[derive(Debug, Clone)]
pub struct ThrottleCoordinator {
    rate: RateLimiter,
    quota: QuotaTracker,
}

impl ThrottleCoordinator {
    /// Create a coordinator over a store, using the system clock.
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock::new()))
    }

    /// Create a coordinator with an explicit clock.
    pub fn with_clock(store: Arc<dyn CounterStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            rate: RateLimiter::with_clock(Arc::clone(&store), Arc::clone(&clock)),
            quota: QuotaTracker::with_clock(store, clock),
        }
    }

    /// Compose a coordinator from independently constructed parts, e.g. a
    /// local-store rate limiter in front of a Redis-backed quota tracker.
    pub fn from_parts(rate: RateLimiter, quota: QuotaTracker) -> Self {
        Self { rate, quota }
    }

    /// Advisory admission check against the configured policies; records
    /// nothing.
    pub async fn check(
        &self,
        identity: &Identity,
        rate: Option<&RatePolicy>,
        quota: Option<&QuotaPolicy>,
    ) -> Result<()> {
        if let Some(policy) = rate {
            self.rate.check(identity, policy).await?;
        }
        if let Some(policy) = quota {
            self.quota.check(identity, policy).await?;
        }
        Ok(())
    }

    /// Record usage against the configured policies and decide admission.
    pub async fn consume(
        &self,
        identity: &Identity,
        rate: Option<&RatePolicy>,
        quota: Option<&QuotaPolicy>,
    ) -> Result<()> {
        if let Some(policy) = rate {
            self.rate.consume(identity, policy).await?;
        }
        if let Some(policy) = quota {
            self.quota.consume(identity, policy).await?;
        }
        Ok(())
    }

    /// Requests left in the current rate limit window. Informational only.
    pub async fn rate_remaining(&self, identity: &Identity, policy: &RatePolicy) -> Result<u64> {
        self.rate.remaining(identity, policy).await
    }

    /// Requests left in the current quota period. Informational only.
    pub async fn quota_remaining(&self, identity: &Identity, policy: &QuotaPolicy) -> Result<u64> {
        self.quota.remaining(identity, policy).await
    }

    /// Seconds until the current rate limit window ends.
    pub fn rate_time_to_reset(&self, policy: &RatePolicy) -> i64 {
        self.rate.time_to_reset(policy)
    }

    /// Seconds until the next quota period boundary.
    pub fn quota_time_to_reset(&self, policy: &QuotaPolicy) -> i64 {
        self.quota.time_to_reset(policy)
    }

    /// The underlying rate limiter.
    pub fn rate(&self) -> &RateLimiter {
        &self.rate
    }

    /// The underlying quota tracker.
    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }
}
