//! Fixed-window rate limiting.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, ThrottleError};
use crate::store::{Admission, CounterStore, WindowBounds};

use super::key::{self, Identity};
use super::policy::RatePolicy;

/// Applies fixed-window rate limit policies against a counter store.
///
/// Stateless: holds only a store reference and a clock. The timeline is cut
/// into equal windows of `policy.window` seconds (`floor(now / window)`),
/// and usage resets fully at each boundary.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a rate limiter over a store, using the system clock.
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock::new()))
    }

    /// Create a rate limiter with an explicit clock, for deterministic
    /// rollover in tests.
    pub fn with_clock(store: Arc<dyn CounterStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn bounds(&self, policy: &RatePolicy) -> WindowBounds {
        let now = self.clock.epoch_secs();
        let window = policy.window_secs();
        let index = now.div_euclid(window);
        WindowBounds {
            index,
            reset_epoch: (index + 1) * window,
        }
    }

    /// Record one request and decide admission.
    ///
    /// Returns the remaining allowance on success. On rejection the
    /// increment is still counted against the window (bounded overshoot),
    /// and the fault carries the retry delay to the next boundary.
    pub async fn consume(&self, identity: &Identity, policy: &RatePolicy) -> Result<u64> {
        let key = key::rate_key(identity, policy)?;
        let bounds = self.bounds(policy);

        trace!(key = %key, limit = policy.limit(), "consuming rate limit");
        match self.store.try_increment(&key, bounds, policy.limit()).await? {
            Admission::Admitted { count } => Ok(policy.limit().saturating_sub(count)),
            Admission::Rejected => {
                debug!(key = %key, limit = policy.limit(), "rate limit exceeded");
                Err(self.exceeded(policy, bounds))
            }
        }
    }

    /// Advisory admission check; does not record usage.
    ///
    /// Reads the counter without mutating it, so a gap exists between a
    /// `check` and a later `consume` under concurrency. Callers that need
    /// an exact decision use `consume` alone.
    pub async fn check(&self, identity: &Identity, policy: &RatePolicy) -> Result<u64> {
        let key = key::rate_key(identity, policy)?;
        let bounds = self.bounds(policy);

        let count = self.store.peek(&key, bounds).await?;
        if count >= policy.limit() {
            debug!(key = %key, limit = policy.limit(), "rate limit exhausted");
            Err(self.exceeded(policy, bounds))
        } else {
            Ok(policy.limit() - count)
        }
    }

    /// Requests left in the current window. Informational only.
    pub async fn remaining(&self, identity: &Identity, policy: &RatePolicy) -> Result<u64> {
        let key = key::rate_key(identity, policy)?;
        let bounds = self.bounds(policy);
        let count = self.store.peek(&key, bounds).await?;
        Ok(policy.limit().saturating_sub(count))
    }

    /// Seconds until the current window ends.
    ///
    /// Fixed windows are aligned to the epoch, so every key under the same
    /// policy shares one boundary; no identity is needed.
    pub fn time_to_reset(&self, policy: &RatePolicy) -> i64 {
        self.bounds(policy).reset_epoch - self.clock.epoch_secs()
    }

    fn exceeded(&self, policy: &RatePolicy, bounds: WindowBounds) -> ThrottleError {
        ThrottleError::RateLimitExceeded {
            limit: policy.limit(),
            remaining: 0,
            retry_after_secs: bounds.reset_epoch - self.clock.epoch_secs(),
            reset_epoch: bounds.reset_epoch,
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::LocalCounterStore;
    use std::time::Duration;

    fn limiter_at(epoch: i64) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::at_epoch(epoch);
        let limiter = RateLimiter::with_clock(
            Arc::new(LocalCounterStore::new()),
            Arc::new(clock.clone()),
        );
        (limiter, clock)
    }

    #[tokio::test]
    async fn test_consume_returns_decreasing_remaining() {
        let (limiter, _) = limiter_at(1_700_000_000);
        let identity = Identity::ip("127.0.0.1");
        let policy = RatePolicy::new(3, Duration::from_secs(60), "/api").unwrap();

        assert_eq!(limiter.consume(&identity, &policy).await.unwrap(), 2);
        assert_eq!(limiter.consume(&identity, &policy).await.unwrap(), 1);
        assert_eq!(limiter.consume(&identity, &policy).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_consume_rejects_with_retry_data() {
        // Aligned to a window boundary so the retry delay is predictable.
        let (limiter, _) = limiter_at(1_700_000_040);
        let identity = Identity::ip("127.0.0.1");
        let policy = RatePolicy::new(2, Duration::from_secs(60), "/api").unwrap();

        limiter.consume(&identity, &policy).await.unwrap();
        limiter.consume(&identity, &policy).await.unwrap();

        let err = limiter.consume(&identity, &policy).await.unwrap_err();
        match err {
            ThrottleError::RateLimitExceeded {
                limit,
                remaining,
                retry_after_secs,
                reset_epoch,
            } => {
                assert_eq!(limit, 2);
                assert_eq!(remaining, 0);
                // now sits exactly on a boundary, so the window runs the
                // full 60 seconds from here.
                assert_eq!(reset_epoch, 1_700_000_100);
                assert_eq!(retry_after_secs, 60);
            }
            other => panic!("expected RateLimitExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_window_rollover_re_admits() {
        let (limiter, clock) = limiter_at(1_700_000_000);
        let identity = Identity::ip("127.0.0.1");
        let policy = RatePolicy::new(1, Duration::from_secs(60), "/api").unwrap();

        limiter.consume(&identity, &policy).await.unwrap();
        assert!(limiter.consume(&identity, &policy).await.is_err());

        clock.advance(chrono::Duration::seconds(60));
        assert_eq!(limiter.consume(&identity, &policy).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_check_does_not_consume() {
        let (limiter, _) = limiter_at(1_700_000_000);
        let identity = Identity::ip("127.0.0.1");
        let policy = RatePolicy::new(2, Duration::from_secs(60), "/api").unwrap();

        for _ in 0..5 {
            assert_eq!(limiter.check(&identity, &policy).await.unwrap(), 2);
        }
        assert_eq!(limiter.consume(&identity, &policy).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_check_faults_when_exhausted() {
        let (limiter, _) = limiter_at(1_700_000_000);
        let identity = Identity::ip("127.0.0.1");
        let policy = RatePolicy::new(1, Duration::from_secs(60), "/api").unwrap();

        limiter.consume(&identity, &policy).await.unwrap();
        let err = limiter.check(&identity, &policy).await.unwrap_err();
        assert!(matches!(err, ThrottleError::RateLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn test_identities_independent() {
        let (limiter, _) = limiter_at(1_700_000_000);
        let policy = RatePolicy::new(1, Duration::from_secs(60), "/api").unwrap();

        limiter
            .consume(&Identity::ip("10.0.0.1"), &policy)
            .await
            .unwrap();
        assert!(limiter.consume(&Identity::ip("10.0.0.1"), &policy).await.is_err());

        // Exhausting one identity never affects another.
        assert_eq!(
            limiter
                .remaining(&Identity::ip("10.0.0.2"), &policy)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_time_to_reset_counts_down() {
        let (limiter, clock) = limiter_at(1_700_000_000);
        let policy = RatePolicy::new(10, Duration::from_secs(60), "/api").unwrap();

        // 1_700_000_000 is not window-aligned for w=60; boundary at ..040.
        assert_eq!(limiter.time_to_reset(&policy), 40);
        clock.advance(chrono::Duration::seconds(25));
        assert_eq!(limiter.time_to_reset(&policy), 15);
    }

    #[tokio::test]
    async fn test_empty_identity_rejected_before_store() {
        let (limiter, _) = limiter_at(1_700_000_000);
        let policy = RatePolicy::new(1, Duration::from_secs(60), "/api").unwrap();

        let err = limiter.consume(&Identity::ip(""), &policy).await.unwrap_err();
        assert!(matches!(err, ThrottleError::InvalidIdentity(_)));
    }
}
