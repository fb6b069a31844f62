//! Identity and storage-key construction.
//!
//! A storage key uniquely addresses one counter. The operator-visible
//! `{identityType}:{identityValue}:{endpoint}` triple (e.g.
//! `ip:203.0.113.7:/api/users`) appears verbatim inside each key, so keys
//! remain grep-able when debugging a live store.

use std::fmt;

use crate::error::{Result, ThrottleError};

use super::policy::{QuotaPolicy, RatePolicy};

/// Key prefix for rate limit counters.
const RATE_PREFIX: &str = "rate";
/// Key prefix for quota counters.
const QUOTA_PREFIX: &str = "quota";

/// A caller identity used to partition counters.
///
/// Two different identities never share a counter, regardless of policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    kind: String,
    value: String,
}

impl Identity {
    /// Create an identity from an arbitrary kind and value.
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Identity derived from a client IP address.
    pub fn ip(addr: impl Into<String>) -> Self {
        Self::new("ip", addr)
    }

    /// Identity derived from an authenticated user (e.g. a JWT subject).
    pub fn user(subject: impl Into<String>) -> Self {
        Self::new("user", subject)
    }

    /// Identity derived from an API key header.
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::new("api-key", key)
    }

    /// The identity kind, e.g. `ip`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The identity value, e.g. `203.0.113.7`.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// A composite key that uniquely addresses one counter in a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the storage key for a rate limit counter.
///
/// Format: `rate:{kind}:{value}:{scope}:{window_secs}`. Pure function; the
/// only failure is an empty identity.
pub fn rate_key(identity: &Identity, policy: &RatePolicy) -> Result<StorageKey> {
    ensure_identity(identity)?;
    Ok(StorageKey(format!(
        "{}:{}:{}:{}:{}",
        RATE_PREFIX,
        identity.kind(),
        identity.value(),
        policy.scope(),
        policy.window_secs()
    )))
}

/// Build the storage key for a quota counter.
///
/// Format: `quota:{kind}:{value}:{scope}:{DAILY|MONTHLY}`.
pub fn quota_key(identity: &Identity, policy: &QuotaPolicy) -> Result<StorageKey> {
    ensure_identity(identity)?;
    Ok(StorageKey(format!(
        "{}:{}:{}:{}:{}",
        QUOTA_PREFIX,
        identity.kind(),
        identity.value(),
        policy.scope(),
        policy.period().tag()
    )))
}

fn ensure_identity(identity: &Identity) -> Result<()> {
    if identity.kind().is_empty() {
        return Err(ThrottleError::InvalidIdentity(
            "identity kind must not be empty".to_string(),
        ));
    }
    if identity.value().is_empty() {
        return Err(ThrottleError::InvalidIdentity(
            "identity value must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::throttle::policy::Period;
    use std::time::Duration;

    fn rate_policy(scope: &str, window_secs: u64) -> RatePolicy {
        RatePolicy::new(10, Duration::from_secs(window_secs), scope).unwrap()
    }

    #[test]
    fn test_rate_key_format() {
        let key = rate_key(&Identity::ip("203.0.113.7"), &rate_policy("/api/users", 60)).unwrap();
        assert_eq!(key.as_str(), "rate:ip:203.0.113.7:/api/users:60");
    }

    #[test]
    fn test_quota_key_format() {
        let policy = QuotaPolicy::new(1000, Period::Daily, "/api/users").unwrap();
        let key = quota_key(&Identity::user("alice"), &policy).unwrap();
        assert_eq!(key.as_str(), "quota:user:alice:/api/users:DAILY");
    }

    #[test]
    fn test_keys_carry_operator_visible_triple() {
        let key = rate_key(&Identity::ip("203.0.113.7"), &rate_policy("/api/users", 60)).unwrap();
        assert!(key.as_str().contains("ip:203.0.113.7:/api/users"));
    }

    #[test]
    fn test_distinct_identities_never_collide() {
        let policy = rate_policy("/api", 60);
        let a = rate_key(&Identity::ip("10.0.0.1"), &policy).unwrap();
        let b = rate_key(&Identity::ip("10.0.0.2"), &policy).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_distinct_windows_never_collide() {
        let identity = Identity::ip("10.0.0.1");
        let a = rate_key(&identity, &rate_policy("/api", 60)).unwrap();
        let b = rate_key(&identity, &rate_policy("/api", 3600)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_distinct_periods_never_collide() {
        let identity = Identity::user("alice");
        let daily = QuotaPolicy::new(10, Period::Daily, "/api").unwrap();
        let monthly = QuotaPolicy::new(10, Period::Monthly, "/api").unwrap();
        assert_ne!(
            quota_key(&identity, &daily).unwrap(),
            quota_key(&identity, &monthly).unwrap()
        );
    }

    #[test]
    fn test_rate_and_quota_namespaces_disjoint() {
        let identity = Identity::user("alice");
        let rate = rate_key(&identity, &rate_policy("/api", 86400)).unwrap();
        let quota = quota_key(
            &identity,
            &QuotaPolicy::new(10, Period::Daily, "/api").unwrap(),
        )
        .unwrap();
        assert_ne!(rate, quota);
    }

    #[test]
    fn test_empty_identity_rejected() {
        let err = rate_key(&Identity::ip(""), &rate_policy("/api", 60)).unwrap_err();
        assert!(matches!(err, ThrottleError::InvalidIdentity(_)));

        let err = rate_key(&Identity::new("", "value"), &rate_policy("/api", 60)).unwrap_err();
        assert!(matches!(err, ThrottleError::InvalidIdentity(_)));
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(Identity::ip("127.0.0.1").to_string(), "ip:127.0.0.1");
        assert_eq!(Identity::api_key("k-123").to_string(), "api-key:k-123");
    }
}
