use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::{RateLimitResult, RateLimiter, RedisWindow};
use crate::config::{RateLimitBackend, RateLimitConfig, StoreErrorPolicy};
use crate::error::{Result, ServiceError};
use crate::telemetry::Metrics;

/// Window store behind the limiter
pub enum WindowStore {
    Memory(RateLimiter),
    Redis(RedisWindow),
}

impl WindowStore {
    pub fn name(&self) -> &'static str {
        match self {
            WindowStore::Memory(_) => "memory",
            WindowStore::Redis(_) => "redis",
        }
    }
}

/// Rate limiter shared by every rate limited endpoint.
///
/// Owns the window store plus the policy applied when that store fails.
pub struct RateLimitManager {
    store: WindowStore,
    capacity: u64,
    store_timeout: Duration,
    on_store_error: StoreErrorPolicy,
    metrics: Option<Arc<Metrics>>,
}

impl RateLimitManager {
    /// Build the manager described by `config`, or `None` when rate limiting is disabled.
    ///
    /// A malformed Redis URL fails here; an unreachable server does not.
    pub async fn from_config(config: &RateLimitConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }

        let store = match config.backend {
            RateLimitBackend::Memory => {
                WindowStore::Memory(RateLimiter::new(config.capacity, config.window()))
            }
            RateLimitBackend::Redis => {
                let url = config.redis_url.as_deref().ok_or_else(|| {
                    ServiceError::Config("rate_limit.redis_url is required for redis".into())
                })?;
                WindowStore::Redis(
                    RedisWindow::connect(
                        url,
                        &config.key_prefix,
                        config.capacity,
                        config.window(),
                        config.store_timeout(),
                    )
                    .await?,
                )
            }
        };

        info!(
            backend = store.name(),
            capacity = config.capacity,
            window_secs = config.window_seconds,
            on_store_error = ?config.on_store_error,
            "rate limiter ready"
        );

        Ok(Some(Self {
            store,
            capacity: u64::from(config.capacity),
            store_timeout: config.store_timeout(),
            on_store_error: config.on_store_error,
            metrics: None,
        }))
    }

    /// In-memory manager, mostly useful for tests and single-instance setups.
    pub fn in_memory(capacity: u32, window: Duration) -> Self {
        Self {
            store: WindowStore::Memory(RateLimiter::new(capacity, window)),
            capacity: u64::from(capacity),
            store_timeout: Duration::from_millis(250),
            on_store_error: StoreErrorPolicy::Allow,
            metrics: None,
        }
    }

    /// Count store failures in `metrics`.
    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Record one attempt for `key` and decide on it.
    ///
    /// Store failures (including timeouts) follow the configured policy:
    /// `allow` admits the request, `deny` returns `ServiceError::Store`.
    pub async fn check(&self, key: &str) -> Result<RateLimitResult> {
        let outcome = match &self.store {
            WindowStore::Memory(limiter) => Ok(limiter.check(&key)),
            WindowStore::Redis(redis) => {
                match tokio::time::timeout(self.store_timeout, redis.check(key)).await {
                    Ok(result) => result,
                    Err(_) => Err(ServiceError::Store(format!(
                        "Redis did not answer within {}ms",
                        self.store_timeout.as_millis()
                    ))),
                }
            }
        };

        match outcome {
            Ok(result) => Ok(result),
            Err(err) => self.on_store_failure(err),
        }
    }

    fn on_store_failure(&self, err: ServiceError) -> Result<RateLimitResult> {
        if let Some(m) = &self.metrics {
            m.record_rate_limit_store_error(self.store.name());
        }
        match self.on_store_error {
            StoreErrorPolicy::Allow => {
                warn!(error = %err, "rate limit store unavailable, admitting request");
                Ok(RateLimitResult::Allowed { limit: self.capacity, remaining: self.capacity })
            }
            StoreErrorPolicy::Deny => {
                warn!(error = %err, "rate limit store unavailable, rejecting request");
                Err(err)
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(policy: StoreErrorPolicy) -> RateLimitManager {
        let mut m = RateLimitManager::in_memory(5, Duration::from_secs(60));
        m.on_store_error = policy;
        m
    }

    #[test]
    fn store_failure_is_admitted_when_failing_open() {
        let m = manager(StoreErrorPolicy::Allow);
        let result = m.on_store_failure(ServiceError::Store("down".into()));
        assert!(matches!(result, Ok(RateLimitResult::Allowed { limit: 5, remaining: 5 })));
    }

    #[test]
    fn store_failure_is_rejected_when_failing_closed() {
        let m = manager(StoreErrorPolicy::Deny);
        let result = m.on_store_failure(ServiceError::Store("down".into()));
        assert!(matches!(result, Err(ServiceError::Store(_))));
    }

    #[tokio::test]
    async fn disabled_config_builds_no_manager() -> Result<()> {
        let config = RateLimitConfig { enabled: false, ..RateLimitConfig::default() };
        assert!(RateLimitManager::from_config(&config).await?.is_none());
        Ok(())
    }
}
