//! Error types for the throttlekit engine.

use thiserror::Error;

use crate::throttle::Period;

/// Main error type for throttlekit operations.
///
/// `RateLimitExceeded` and `QuotaExceeded` are admission faults: expected,
/// recoverable-by-caller outcomes that carry enough data to build a retry
/// or backoff response. The remaining variants are genuine failures.
#[derive(Debug, Error)]
pub enum ThrottleError {
    /// A policy failed validation at construction time.
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// The caller-supplied identity is empty or unusable.
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// A fixed-window rate limit rejected the request.
    #[error("Rate limit exceeded: limit {limit}, retry in {retry_after_secs}s")]
    RateLimitExceeded {
        /// Maximum requests permitted per window.
        limit: u64,
        /// Requests left in the window; always 0 at the moment of the fault.
        remaining: u64,
        /// Seconds until the next window boundary.
        retry_after_secs: i64,
        /// Epoch second at which the next window begins.
        reset_epoch: i64,
    },

    /// A calendar-period quota rejected the request.
    #[error("{period} quota exceeded: limit {limit}, resets at epoch {reset_epoch}")]
    QuotaExceeded {
        /// The calendar period that was exhausted.
        period: Period,
        /// Maximum requests permitted per period.
        limit: u64,
        /// Requests left in the period; always 0 at the moment of the fault.
        remaining: u64,
        /// Epoch second of the next period boundary.
        reset_epoch: i64,
    },

    /// The remote counter store could not be reached or timed out.
    ///
    /// Propagated unchanged; the engine performs no retries and defines no
    /// fail-open/fail-closed default. That choice belongs to the caller.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] redis::RedisError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ThrottleError {
    /// True for admission faults, as opposed to infrastructure failures.
    pub fn is_exceeded(&self) -> bool {
        matches!(
            self,
            ThrottleError::RateLimitExceeded { .. } | ThrottleError::QuotaExceeded { .. }
        )
    }
}

/// Result type alias for throttlekit operations.
pub type Result<T> = std::result::Result<T, ThrottleError>;
