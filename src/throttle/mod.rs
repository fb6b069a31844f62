//! Admission policies, key building, and the enforcement facades.

pub mod key;
mod coordinator;
mod policy;
mod quota;
mod rate;

pub use coordinator::ThrottleCoordinator;
pub use key::{quota_key, rate_key, Identity, StorageKey};
pub use policy::{Period, QuotaPolicy, RatePolicy};
pub use quota::{is_new_period, next_reset_epoch, period_index, QuotaTracker};
pub use rate::RateLimiter;
