//! Shared sliding log kept in Redis.
//!
//! Each client key maps to a sorted set of attempt timestamps. A single Lua
//! script trims entries older than the window, records the new attempt,
//! refreshes the key TTL and returns the count, so check-and-increment is
//! atomic across every instance sharing the Redis server. The script reads
//! the Redis clock, which keeps instances with skewed clocks consistent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ahash::RandomState;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{Client, Script};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::error::{Result, ServiceError};
use crate::security::rate_limit::RateLimitResult;

const SLIDING_LOG_SCRIPT: &str = r"
local t = redis.call('TIME')
local now_ms = tonumber(t[1]) * 1000 + math.floor(tonumber(t[2]) / 1000)
local window_ms = tonumber(ARGV[1])
redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', now_ms - window_ms)
redis.call('ZADD', KEYS[1], now_ms, ARGV[2])
redis.call('PEXPIRE', KEYS[1], window_ms)
local count = redis.call('ZCARD', KEYS[1])
local reset_ms = window_ms
local oldest = redis.call('ZRANGE', KEYS[1], 0, 0, 'WITHSCORES')
if oldest[2] then
  reset_ms = tonumber(oldest[2]) + window_ms - now_ms
end
return {count, reset_ms}
";

pub struct RedisWindow {
    client: Client,
    /// Established on first use and kept; `ConnectionManager` reconnects by itself
    connection: OnceCell<ConnectionManager>,
    script: Script,
    key_prefix: String,
    capacity: u64,
    window: Duration,
    instance: u64,
    sequence: AtomicU64,
}

impl RedisWindow {
    /// Parse `redis_url` and try to connect once within `connect_timeout`.
    ///
    /// A malformed URL is an error. An unreachable server is only logged: the
    /// connection is retried on the next check, and the store failure policy
    /// applies until it succeeds.
    pub async fn connect(
        redis_url: &str,
        key_prefix: &str,
        capacity: u32,
        window: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| ServiceError::Store(format!("Invalid Redis URL: {e}")))?;

        let store = Self {
            client,
            connection: OnceCell::new(),
            script: Script::new(SLIDING_LOG_SCRIPT),
            key_prefix: key_prefix.to_string(),
            capacity: u64::from(capacity),
            window,
            // distinguishes members written by different processes in the same millisecond
            instance: RandomState::new().hash_one(std::process::id()),
            sequence: AtomicU64::new(0),
        };

        match tokio::time::timeout(connect_timeout, store.connection()).await {
            Ok(Ok(_)) => info!("connected to Redis rate limit store"),
            Ok(Err(e)) => warn!(error = %e, "Redis unreachable, will retry on demand"),
            Err(_) => warn!(
                timeout_ms = connect_timeout.as_millis() as u64,
                "Redis connect timed out, will retry on demand"
            ),
        }

        Ok(store)
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new().set_number_of_retries(1);
                self.client
                    .get_connection_manager_with_config(config)
                    .await
                    .map_err(|e| ServiceError::Store(format!("Failed to connect to Redis: {e}")))
            })
            .await?;
        Ok(connection.clone())
    }

    /// Record one attempt for `key` and decide on it.
    pub async fn check(&self, key: &str) -> Result<RateLimitResult> {
        let mut connection = self.connection().await?;
        let member = attempt_member(self.instance, self.sequence.fetch_add(1, Ordering::Relaxed));
        let window_ms = self.window.as_millis() as u64;

        let (count, reset_ms): (u64, i64) = self
            .script
            .key(storage_key(&self.key_prefix, key))
            .arg(window_ms)
            .arg(member)
            .invoke_async(&mut connection)
            .await
            .map_err(|e| ServiceError::Store(format!("Redis sliding window update failed: {e}")))?;

        let reset_after = Duration::from_millis(reset_ms.max(0) as u64);
        Ok(RateLimitResult::from_count(count, self.capacity, reset_after))
    }
}

fn storage_key(prefix: &str, key: &str) -> String {
    format!("{prefix}:{key}")
}

fn attempt_member(instance: u64, sequence: u64) -> String {
    format!("{instance:016x}-{sequence}")
}
