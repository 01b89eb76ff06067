use octoquest_lib::security::rate_limit::{RateLimitManager, RateLimitResult, RateLimiter};
use std::thread::sleep;
use std::time::Duration;

#[test]
fn test_thirty_per_window() {
    let limiter = RateLimiter::new(30, Duration::from_secs(60));
    let key = "203.0.113.10";

    for i in 0..30 {
        let result = limiter.check(&key);
        assert!(result.is_allowed(), "Request {} should be allowed, got {:?}", i, result);
        assert_eq!(result.remaining(), 30 - i - 1);
    }

    let result = limiter.check(&key);
    assert!(result.is_limited(), "Request 31 should be limited, got {:?}", result);
    assert_eq!(result.remaining(), 0);
    assert_eq!(result.limit(), 30);
    // the first attempt is the oldest one still counted
    assert!(result
        .reset_after()
        .is_some_and(|d| d > Duration::from_secs(55) && d <= Duration::from_secs(60)));
}

#[test]
fn test_rejected_attempts_still_count() {
    let limiter = RateLimiter::new(3, Duration::from_secs(60));
    let key = "client";

    for _ in 0..10 {
        limiter.check(&key);
    }
    // over quota attempts keep the caller limited
    assert!(limiter.check(&key).is_limited());
}

#[test]
fn test_multiple_keys() {
    let limiter = RateLimiter::new(10, Duration::from_secs(60));

    // Different keys should have independent limits
    for _ in 0..10 {
        assert!(limiter.check(&"198.51.100.1").is_allowed());
    }
    for _ in 0..10 {
        assert!(limiter.check(&"198.51.100.2").is_allowed());
    }

    // Both should be limited now
    assert!(limiter.check(&"198.51.100.1").is_limited());
    assert!(limiter.check(&"198.51.100.2").is_limited());
}

#[test]
fn test_window_slides_back_open() {
    let limiter = RateLimiter::new(5, Duration::from_millis(100));
    let key = "test";

    for _ in 0..5 {
        assert!(limiter.check(&key).is_allowed());
    }
    assert!(limiter.check(&key).is_limited());

    // two full windows later nothing is carried over
    sleep(Duration::from_millis(250));
    let result = limiter.check(&key);
    assert!(result.is_allowed(), "After the window, request should be allowed, got {:?}", result);
    assert_eq!(result.remaining(), 4);
}

#[test]
fn test_no_more_than_capacity_in_any_rolling_window() {
    let window = Duration::from_millis(1000);
    let limiter = RateLimiter::new(30, window);
    let key = "203.0.113.20";

    // a burst late in one second and another early in the next, 600ms apart
    sleep(Duration::from_millis(900));
    let first = (0..30).filter(|_| limiter.check(&key).is_allowed()).count();
    sleep(Duration::from_millis(600));
    let second = (0..30).filter(|_| limiter.check(&key).is_allowed()).count();

    assert_eq!(first, 30);
    assert_eq!(
        second,
        0,
        "admitted {} attempts within one rolling window of capacity 30",
        first + second
    );
}

#[test]
fn test_result_accessors() {
    let allowed = RateLimitResult::from_count(3, 30, Duration::from_secs(60));
    assert_eq!(allowed, RateLimitResult::Allowed { limit: 30, remaining: 27 });
    assert_eq!(allowed.reset_after(), None);

    let limited = RateLimitResult::from_count(31, 30, Duration::from_secs(7));
    assert_eq!(limited.reset_after(), Some(Duration::from_secs(7)));
    assert_eq!(limited.remaining(), 0);
}

#[tokio::test]
async fn test_in_memory_manager() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let manager = RateLimitManager::in_memory(2, Duration::from_secs(60));
    assert_eq!(manager.backend_name(), "memory");
    assert_eq!(manager.capacity(), 2);

    assert!(manager.check("192.0.2.9").await?.is_allowed());
    assert!(manager.check("192.0.2.9").await?.is_allowed());
    assert!(manager.check("192.0.2.9").await?.is_limited());
    assert!(manager.check("192.0.2.10").await?.is_allowed());
    Ok(())
}
