//! Sliding log checks against a real Redis server.
//!
//! Needs a reachable server, so the tests are ignored by default:
//!
//! ```bash
//! OCTOQUEST_TEST_REDIS_URL=redis://127.0.0.1:6379 \
//!     cargo test -p octoquest-lib --test rate_limit_redis -- --ignored
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use octoquest_lib::config::{RateLimitBackend, RateLimitConfig, StoreErrorPolicy};
use octoquest_lib::security::RateLimitManager;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type TestResult = Result<(), BoxError>;

const REDIS_URL_VAR: &str = "OCTOQUEST_TEST_REDIS_URL";

/// Manager on the test server that surfaces store errors instead of admitting.
async fn redis_manager(capacity: u32, window_seconds: u64) -> Result<RateLimitManager, BoxError> {
    let url = std::env::var(REDIS_URL_VAR).unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
    let config = RateLimitConfig {
        capacity,
        window_seconds,
        backend: RateLimitBackend::Redis,
        redis_url: Some(url),
        // fresh keys on every run
        key_prefix: format!("octoquest-test:{}:{nanos}", std::process::id()),
        store_timeout_ms: 2_000,
        on_store_error: StoreErrorPolicy::Deny,
        ..RateLimitConfig::default()
    };
    let manager = RateLimitManager::from_config(&config).await?.ok_or("limiter disabled")?;
    assert_eq!(manager.backend_name(), "redis");
    Ok(manager)
}

#[ignore = "requires a Redis server, run explicitly with --ignored"]
#[tokio::test]
async fn thirty_first_attempt_is_limited() -> TestResult {
    let manager = redis_manager(30, 60).await?;

    for i in 0..30u64 {
        let result = manager.check("198.51.100.7").await?;
        assert!(result.is_allowed(), "attempt {} should be allowed, got {:?}", i + 1, result);
        assert_eq!(result.remaining(), 30 - i - 1);
    }

    let result = manager.check("198.51.100.7").await?;
    assert!(result.is_limited(), "attempt 31 should be limited, got {result:?}");
    assert!(result.reset_after().is_some_and(|d| d <= Duration::from_secs(60)));
    Ok(())
}

#[ignore = "requires a Redis server, run explicitly with --ignored"]
#[tokio::test]
async fn keys_are_independent() -> TestResult {
    let manager = redis_manager(2, 60).await?;

    assert!(manager.check("192.0.2.1").await?.is_allowed());
    assert!(manager.check("192.0.2.1").await?.is_allowed());
    assert!(manager.check("192.0.2.1").await?.is_limited());

    assert!(manager.check("192.0.2.2").await?.is_allowed());
    assert!(manager.check("192.0.2.2").await?.is_allowed());
    Ok(())
}

#[ignore = "requires a Redis server, run explicitly with --ignored"]
#[tokio::test]
async fn quota_returns_after_the_window() -> TestResult {
    let manager = redis_manager(2, 1).await?;

    assert!(manager.check("192.0.2.3").await?.is_allowed());
    assert!(manager.check("192.0.2.3").await?.is_allowed());
    assert!(manager.check("192.0.2.3").await?.is_limited());

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert!(manager.check("192.0.2.3").await?.is_allowed());
    Ok(())
}
