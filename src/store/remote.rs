//! Redis-backed counter store.
//!
//! Counters shared by multiple process instances over one Redis server. The
//! whole "check marker, maybe reset, increment, compare to limit" sequence
//! runs as a single server-side script, so the store, not the callers,
//! establishes a total order per key. A plain get-then-set from the client
//! would let two instances both read `limit - 1` and both admit.
//!
//! Connections go through [`redis::aio::ConnectionManager`], which
//! multiplexes and reconnects automatically; cloning it is cheap and every
//! operation clones its own handle. Any Redis failure surfaces as
//! [`ThrottleError::StoreUnavailable`](crate::ThrottleError::StoreUnavailable)
//! with no retry and no assumption about whether the increment landed.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use tracing::trace;

use crate::error::Result;
use crate::throttle::StorageKey;

use super::{Admission, CounterStore, WindowBounds};

/// Atomic conditional increment, protocol v1.
///
/// `KEYS[1]` is the counter; `KEYS[1]:reset` holds the epoch second of the
/// next rollover. `ARGV[1]` is the reset epoch for the active window,
/// `ARGV[2]` the limit. Rollover uses the server's own clock (`TIME`), and
/// the reset marker is only ever written when it lies strictly in the
/// future, so the reset point never moves backward. Returns the new count,
/// or `-1` when the limit is spent; the increment that triggered the
/// rejection stays persisted until the next reset.
const TRY_INCREMENT_V1: &str = r#"
local reset_key = KEYS[1] .. ':reset'
local reset = redis.call('GET', reset_key)
local now = tonumber(redis.call('TIME')[1])
local reset_epoch = tonumber(ARGV[1])
local limit = tonumber(ARGV[2])
redis.call('SETNX', KEYS[1], 0)
if (not reset) or (tonumber(reset) < now) then
    redis.call('SET', KEYS[1], 0)
    if reset_epoch > now then
        redis.call('SET', reset_key, reset_epoch)
        redis.call('EXPIREAT', KEYS[1], reset_epoch + 60)
        redis.call('EXPIREAT', reset_key, reset_epoch + 60)
    end
end
local count = redis.call('INCR', KEYS[1])
if count > limit then
    return -1
end
return count
"#;

/// Configuration for the Redis counter store.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Prefix applied to every key (default: `throttlekit:`). Lets several
    /// deployments or test runs share one server without colliding.
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "throttlekit:".to_string(),
        }
    }
}

/// Counter store backed by a shared Redis server.
///
/// Multiple independently configured coordinators, in one process or many,
/// may share a single `RedisCounterStore` and observe one consistent
/// counter per key.
pub struct RedisCounterStore {
    connection: ConnectionManager,
    script: Script,
    config: RedisStoreConfig,
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Clone for RedisCounterStore {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            script: Script::new(TRY_INCREMENT_V1),
            config: self.config.clone(),
        }
    }
}

impl RedisCounterStore {
    /// Connect with the default configuration.
    ///
    /// `url` is a Redis connection URL, e.g. `redis://127.0.0.1/`.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, RedisStoreConfig::default()).await
    }

    /// Connect with a custom configuration.
    pub async fn connect_with_config(url: &str, config: RedisStoreConfig) -> Result<Self> {
        let client = Client::open(url).map_err(crate::ThrottleError::from)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(crate::ThrottleError::from)?;
        Ok(Self::from_manager(connection, config))
    }

    /// Build a store over an existing connection manager.
    pub fn from_manager(connection: ConnectionManager, config: RedisStoreConfig) -> Self {
        Self {
            connection,
            script: Script::new(TRY_INCREMENT_V1),
            config,
        }
    }

    fn redis_key(&self, key: &StorageKey) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    /// Delete every key under the configured prefix.
    ///
    /// Cursored `SCAN`, so it is safe on a shared server. Useful for tests
    /// and operational resets; never called by the engine itself.
    pub async fn clear(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        let pattern = format!("{}*", self.config.key_prefix);
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                let _: () = conn.del(&keys).await?;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn try_increment(
        &self,
        key: &StorageKey,
        bounds: WindowBounds,
        limit: u64,
    ) -> Result<Admission> {
        let mut conn = self.connection.clone();
        let result: i64 = self
            .script
            .key(self.redis_key(key))
            .arg(bounds.reset_epoch)
            .arg(limit)
            .invoke_async(&mut conn)
            .await?;

        if result < 0 {
            trace!(key = %key, limit, "redis counter over limit");
            Ok(Admission::Rejected)
        } else {
            Ok(Admission::Admitted {
                count: result as u64,
            })
        }
    }

    async fn peek(&self, key: &StorageKey, bounds: WindowBounds) -> Result<u64> {
        let mut conn = self.connection.clone();
        let counter_key = self.redis_key(key);
        let reset_key = format!("{counter_key}:reset");

        // Plain reads, one round trip. This can lag concurrent writers and
        // must never be used as an admission basis.
        let (count, reset): (Option<u64>, Option<i64>) = redis::pipe()
            .get(&counter_key)
            .get(&reset_key)
            .query_async(&mut conn)
            .await?;

        let count = match (count, reset) {
            // A marker older than the caller's window means the stored count
            // belongs to a period that has already ended.
            (Some(count), Some(reset)) if reset >= bounds.reset_epoch => count,
            _ => 0,
        };
        Ok(count)
    }
}
