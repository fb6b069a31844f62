//! Admission policies: fixed-window rate limits and calendar-period quotas.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ThrottleError};

/// Calendar period for quota policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// Resets at the next local midnight.
    Daily,
    /// Resets at the first local midnight of the next month.
    Monthly,
}

impl Period {
    /// Lowercase name, as used in wire responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Monthly => "monthly",
        }
    }

    /// Uppercase tag, as used in storage keys.
    pub fn tag(&self) -> &'static str {
        match self {
            Period::Daily => "DAILY",
            Period::Monthly => "MONTHLY",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fixed-window rate limit policy, e.g. "100 per minute".
///
/// Immutable once constructed; validation happens here so invalid limits
/// never reach a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatePolicy {
    limit: u64,
    window: Duration,
    scope: String,
}

impl RatePolicy {
    /// Create a rate limit policy.
    ///
    /// `scope` is the policy discriminator incorporated into storage keys,
    /// typically an endpoint path such as `/api/users`.
    pub fn new(limit: u64, window: Duration, scope: impl Into<String>) -> Result<Self> {
        let scope = scope.into();
        if limit == 0 {
            return Err(ThrottleError::InvalidPolicy(
                "limit must be greater than 0".to_string(),
            ));
        }
        if window.as_secs() == 0 {
            return Err(ThrottleError::InvalidPolicy(
                "window must be at least one second".to_string(),
            ));
        }
        if scope.is_empty() {
            return Err(ThrottleError::InvalidPolicy(
                "scope must not be empty".to_string(),
            ));
        }
        Ok(Self {
            limit,
            window,
            scope,
        })
    }

    /// Maximum requests permitted per window.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// The window duration.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Window size in whole seconds.
    pub fn window_secs(&self) -> i64 {
        self.window.as_secs() as i64
    }

    /// The policy discriminator.
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

/// A calendar-period quota policy, e.g. "1000 per day".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaPolicy {
    limit: u64,
    period: Period,
    scope: String,
}

impl QuotaPolicy {
    /// Create a quota policy. See [`RatePolicy::new`] for the `scope` role.
    pub fn new(limit: u64, period: Period, scope: impl Into<String>) -> Result<Self> {
        let scope = scope.into();
        if limit == 0 {
            return Err(ThrottleError::InvalidPolicy(
                "limit must be greater than 0".to_string(),
            ));
        }
        if scope.is_empty() {
            return Err(ThrottleError::InvalidPolicy(
                "scope must not be empty".to_string(),
            ));
        }
        Ok(Self {
            limit,
            period,
            scope,
        })
    }

    /// Maximum requests permitted per period.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// The calendar period.
    pub fn period(&self) -> Period {
        self.period
    }

    /// The policy discriminator.
    pub fn scope(&self) -> &str {
        &self.scope
    }
}
