//! Throttlekit: admission control for keyed operations.
//!
//! Two policies over one counting engine: fixed-window rate limits
//! ("100 per minute") and calendar-period quotas ("10000 per day",
//! resetting at local midnight). Request-handling layers ask "may this
//! identity proceed?" before doing work and record the usage when they do;
//! an exceeded fault carries the limit, remaining, and reset data the
//! caller needs to build a 429 response.
//!
//! State lives in a [`CounterStore`](store::CounterStore):
//! [`LocalCounterStore`](store::LocalCounterStore) keeps lock-free counters
//! inside one process, [`RedisCounterStore`](store::RedisCounterStore)
//! shares them across replicas through a server-side atomic script. The
//! facades ([`RateLimiter`](throttle::RateLimiter),
//! [`QuotaTracker`](throttle::QuotaTracker), and the composing
//! [`ThrottleCoordinator`](throttle::ThrottleCoordinator)) are stateless
//! and hold only configuration, a store, and an injectable
//! [`Clock`](clock::Clock).
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use throttlekit::{Identity, LocalCounterStore, RatePolicy, ThrottleCoordinator};
//!
//! # async fn example() -> throttlekit::Result<()> {
//! let coordinator = ThrottleCoordinator::new(Arc::new(LocalCounterStore::new()));
//! let policy = RatePolicy::new(100, Duration::from_secs(60), "/api/users")?;
//!
//! coordinator
//!     .consume(&Identity::ip("203.0.113.7"), Some(&policy), None)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod store;
pub mod throttle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ThrottleConfig;
pub use error::{Result, ThrottleError};
pub use store::{
    Admission, CounterStore, LocalCounterStore, RedisCounterStore, RedisStoreConfig, WindowBounds,
};
pub use throttle::{
    Identity, Period, QuotaPolicy, QuotaTracker, RateLimiter, RatePolicy, StorageKey,
    ThrottleCoordinator,
};
