//! Wire mapping for admission faults.
//!
//! The engine does not speak HTTP; the boundary layer that does translates
//! an exceeded fault into a `429` response with the headers and body below.
//! Everything here is pure data so any framework can consume it.

use serde_json::{json, Value};

use crate::error::ThrottleError;
use crate::throttle::Period;

/// Status code for any exceeded fault.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Header names on a rate limit fault.
pub const X_RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
pub const X_RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
pub const X_RATE_LIMIT_RESET: &str = "X-RateLimit-Reset";

/// Header names on a daily quota fault.
pub const X_QUOTA_DAILY_LIMIT: &str = "X-Quota-Daily-Limit";
pub const X_QUOTA_DAILY_REMAINING: &str = "X-Quota-Daily-Remaining";
pub const X_QUOTA_DAILY_RESET: &str = "X-Quota-Daily-Reset";

/// Header names on a monthly quota fault.
pub const X_QUOTA_MONTHLY_LIMIT: &str = "X-Quota-Monthly-Limit";
pub const X_QUOTA_MONTHLY_REMAINING: &str = "X-Quota-Monthly-Remaining";
pub const X_QUOTA_MONTHLY_RESET: &str = "X-Quota-Monthly-Reset";

/// Standard retry hint header.
pub const RETRY_AFTER: &str = "Retry-After";

/// Response headers for an exceeded fault, as name/value pairs.
///
/// Returns `None` for errors that are not admission faults; those map to
/// 5xx responses at the caller's discretion, not to 429. `now_epoch` is the
/// caller's current time, used to derive `Retry-After` for quota faults.
pub fn fault_headers(error: &ThrottleError, now_epoch: i64) -> Option<Vec<(&'static str, String)>> {
    match error {
        ThrottleError::RateLimitExceeded {
            limit,
            remaining,
            retry_after_secs,
            reset_epoch,
        } => Some(vec![
            (X_RATE_LIMIT_LIMIT, limit.to_string()),
            (X_RATE_LIMIT_REMAINING, remaining.to_string()),
            (X_RATE_LIMIT_RESET, reset_epoch.to_string()),
            (RETRY_AFTER, retry_after_secs.to_string()),
        ]),
        ThrottleError::QuotaExceeded {
            period,
            limit,
            remaining,
            reset_epoch,
        } => {
            let (limit_name, remaining_name, reset_name) = match period {
                Period::Daily => (X_QUOTA_DAILY_LIMIT, X_QUOTA_DAILY_REMAINING, X_QUOTA_DAILY_RESET),
                Period::Monthly => (
                    X_QUOTA_MONTHLY_LIMIT,
                    X_QUOTA_MONTHLY_REMAINING,
                    X_QUOTA_MONTHLY_RESET,
                ),
            };
            let mut headers = vec![
                (limit_name, limit.to_string()),
                (remaining_name, remaining.to_string()),
                (reset_name, reset_epoch.to_string()),
            ];
            let retry_after = reset_epoch - now_epoch;
            if retry_after > 0 {
                headers.push((RETRY_AFTER, retry_after.to_string()));
            }
            Some(headers)
        }
        _ => None,
    }
}

/// JSON error body for an exceeded fault.
///
/// Shape matches the headers: enough data for a client to back off without
/// parsing the message text.
pub fn fault_body(error: &ThrottleError, now_epoch: i64) -> Option<Value> {
    match error {
        ThrottleError::RateLimitExceeded {
            limit,
            remaining,
            retry_after_secs,
            ..
        } => Some(json!({
            "error": error.to_string(),
            "type": "rate_limit",
            "limit": limit,
            "remaining": remaining,
            "retry_after_seconds": retry_after_secs,
            "timestamp": now_epoch,
        })),
        ThrottleError::QuotaExceeded {
            period,
            limit,
            remaining,
            reset_epoch,
        } => Some(json!({
            "error": error.to_string(),
            "type": "quota",
            "period": period.as_str(),
            "limit": limit,
            "remaining": remaining,
            "reset_time": reset_epoch,
        })),
        _ => None,
    }
}
