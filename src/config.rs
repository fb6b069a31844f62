//! Policy configuration loaded from YAML.
//!
//! Declarations are validated eagerly by constructing the real policy
//! values, so a bad limit or empty scope fails at load time rather than on
//! the first request.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ThrottleError};
use crate::throttle::{Period, QuotaPolicy, RatePolicy};

/// A complete throttle configuration: named policy sets.
///
/// ```yaml
/// policies:
///   api_default:
///     scope: /api/users
///     rate:
///       limit: 100
///       window_secs: 60
///     quota:
///       limit: 10000
///       period: daily
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Map of policy set name to its declaration.
    #[serde(default)]
    pub policies: HashMap<String, PolicySetConfig>,
}

/// One named policy set: a scope plus optional rate and quota rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySetConfig {
    /// Policy discriminator used in storage keys, e.g. an endpoint path.
    pub scope: String,
    /// Fixed-window rate limit rule, if any.
    #[serde(default)]
    pub rate: Option<RateRule>,
    /// Calendar-period quota rule, if any.
    #[serde(default)]
    pub quota: Option<QuotaRule>,
}

/// A fixed-window rate limit declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateRule {
    /// Requests allowed per window.
    pub limit: u64,
    /// Window size in seconds.
    pub window_secs: u64,
}

/// A calendar-period quota declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaRule {
    /// Requests allowed per period.
    pub limit: u64,
    /// `daily` or `monthly`.
    pub period: Period,
}

impl ThrottleConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading throttle configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ThrottleConfig = serde_yaml::from_str(yaml)
            .map_err(|e| ThrottleError::Config(format!("Failed to parse throttle config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Get a policy set by name.
    pub fn get(&self, name: &str) -> Option<&PolicySetConfig> {
        self.policies.get(name)
    }

    fn validate(&self) -> Result<()> {
        for (name, set) in &self.policies {
            set.rate_policy()
                .map_err(|e| ThrottleError::Config(format!("policy set '{name}': {e}")))?;
            set.quota_policy()
                .map_err(|e| ThrottleError::Config(format!("policy set '{name}': {e}")))?;
        }
        Ok(())
    }
}

impl PolicySetConfig {
    /// Build the rate limit policy declared by this set, if any.
    pub fn rate_policy(&self) -> Result<Option<RatePolicy>> {
        self.rate
            .as_ref()
            .map(|rule| {
                RatePolicy::new(
                    rule.limit,
                    Duration::from_secs(rule.window_secs),
                    self.scope.clone(),
                )
            })
            .transpose()
    }

    /// Build the quota policy declared by this set, if any.
    pub fn quota_policy(&self) -> Result<Option<QuotaPolicy>> {
        self.quota
            .as_ref()
            .map(|rule| QuotaPolicy::new(rule.limit, rule.period, self.scope.clone()))
            .transpose()
    }
}
