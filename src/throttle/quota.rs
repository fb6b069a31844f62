//! Calendar-period quota tracking.
//!
//! Quotas reset at wall-clock calendar boundaries in the host-local
//! timezone: the next local midnight for daily quotas, the first local
//! midnight of the next month for monthly ones. This is deliberately
//! different from fixed windows, which are duration-aligned.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, ThrottleError};
use crate::store::{Admission, CounterStore, WindowBounds};

use super::key::{self, Identity};
use super::policy::{Period, QuotaPolicy};

/// Applies calendar-period quota policies against a counter store.
///
/// Stateless facade, same shape as [`RateLimiter`](super::RateLimiter); only
/// the boundary arithmetic differs.
#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl QuotaTracker {
    /// Create a quota tracker over a store, using the system clock.
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock::new()))
    }

    /// Create a quota tracker with an explicit clock.
    pub fn with_clock(store: Arc<dyn CounterStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn bounds(&self, period: Period) -> WindowBounds {
        let now = self.clock.now().with_timezone(&Local);
        WindowBounds {
            index: period_index(now, period),
            reset_epoch: next_reset_epoch(now, period),
        }
    }

    /// Record one request and decide admission.
    pub async fn consume(&self, identity: &Identity, policy: &QuotaPolicy) -> Result<u64> {
        let key = key::quota_key(identity, policy)?;
        let bounds = self.bounds(policy.period());

        trace!(key = %key, limit = policy.limit(), "consuming quota");
        match self.store.try_increment(&key, bounds, policy.limit()).await? {
            Admission::Admitted { count } => Ok(policy.limit().saturating_sub(count)),
            Admission::Rejected => {
                debug!(key = %key, period = %policy.period(), "quota exceeded");
                Err(self.exceeded(policy, bounds))
            }
        }
    }

    /// Advisory admission check; does not record usage.
    pub async fn check(&self, identity: &Identity, policy: &QuotaPolicy) -> Result<u64> {
        let key = key::quota_key(identity, policy)?;
        let bounds = self.bounds(policy.period());

        let count = self.store.peek(&key, bounds).await?;
        if count >= policy.limit() {
            debug!(key = %key, period = %policy.period(), "quota exhausted");
            Err(self.exceeded(policy, bounds))
        } else {
            Ok(policy.limit() - count)
        }
    }

    /// Requests left in the current period. Informational only.
    pub async fn remaining(&self, identity: &Identity, policy: &QuotaPolicy) -> Result<u64> {
        let key = key::quota_key(identity, policy)?;
        let bounds = self.bounds(policy.period());
        let count = self.store.peek(&key, bounds).await?;
        Ok(policy.limit().saturating_sub(count))
    }

    /// Seconds until the next period boundary.
    pub fn time_to_reset(&self, policy: &QuotaPolicy) -> i64 {
        let bounds = self.bounds(policy.period());
        (bounds.reset_epoch - self.clock.epoch_secs()).max(0)
    }

    fn exceeded(&self, policy: &QuotaPolicy, bounds: WindowBounds) -> ThrottleError {
        ThrottleError::QuotaExceeded {
            period: policy.period(),
            limit: policy.limit(),
            remaining: 0,
            reset_epoch: bounds.reset_epoch,
        }
    }
}

impl std::fmt::Debug for QuotaTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaTracker").finish_non_exhaustive()
    }
}

/// Ordinal of the period containing `now`.
///
/// Daily periods count days from the common era, monthly ones count months
/// from year zero; both advance by exactly one at each boundary, never
/// repeat, and never decrease, which is what the store's rollover marker
/// requires.
pub fn period_index(now: DateTime<Local>, period: Period) -> i64 {
    match period {
        Period::Daily => i64::from(now.date_naive().num_days_from_ce()),
        Period::Monthly => i64::from(now.year()) * 12 + i64::from(now.month0()),
    }
}

/// True when `now` falls in a later calendar period than `last_reset_epoch`.
///
/// Daily: the day-of-year or year differs. Monthly: the month or year
/// differs. Equivalent to comparing [`period_index`] values, which the
/// tests assert.
pub fn is_new_period(last_reset_epoch: i64, now: DateTime<Local>, period: Period) -> bool {
    let last = match Local.timestamp_opt(last_reset_epoch, 0) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => return true,
    };
    match period {
        Period::Daily => last.ordinal() != now.ordinal() || last.year() != now.year(),
        Period::Monthly => last.month() != now.month() || last.year() != now.year(),
    }
}

/// Epoch second of the next period boundary after `now`.
pub fn next_reset_epoch(now: DateTime<Local>, period: Period) -> i64 {
    let today = now.date_naive();
    let next = match period {
        Period::Daily => today.succ_opt().unwrap_or(NaiveDate::MAX),
        Period::Monthly => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
        }
    };
    match next.and_hms_opt(0, 0, 0) {
        Some(midnight) => local_epoch(midnight),
        None => i64::MAX,
    }
}

/// Resolve a local-naive datetime to an epoch second.
///
/// A DST transition can make local midnight ambiguous or nonexistent; the
/// earliest valid instant wins, falling back to a UTC reading when the
/// local time does not exist at all.
fn local_epoch(naive: NaiveDateTime) -> i64 {
    match naive.and_local_timezone(Local) {
        LocalResult::Single(dt) => dt.timestamp(),
        LocalResult::Ambiguous(earliest, _) => earliest.timestamp(),
        LocalResult::None => naive.and_utc().timestamp(),
    }
}
