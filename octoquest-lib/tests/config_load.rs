use std::io::Write;

use octoquest_lib::config::{load_from_path, load_from_str, RateLimitBackend, StoreErrorPolicy};
use tempfile::NamedTempFile;

type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[test]
fn empty_file_uses_defaults() -> TestResult {
    let mut file = NamedTempFile::new()?;
    file.write_all(b"")?;

    let cfg = load_from_path(file.path())?;
    assert_eq!(cfg.listen.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.github.api_url, "https://api.github.com");
    assert_eq!(cfg.github.search_query, "followers:>1000");
    assert_eq!(cfg.github.per_page, 100);
    assert_eq!(cfg.github.max_concurrent_enrichments, 100);
    assert!(cfg.github.token.is_none());

    assert!(cfg.rate_limit.enabled);
    assert_eq!(cfg.rate_limit.capacity, 30);
    assert_eq!(cfg.rate_limit.window_seconds, 60);
    assert_eq!(cfg.rate_limit.backend, RateLimitBackend::Memory);
    assert_eq!(cfg.rate_limit.on_store_error, StoreErrorPolicy::Allow);
    assert!(cfg.telemetry.metrics_port.is_none());
    Ok(())
}

#[test]
fn loads_full_config() -> TestResult {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
listen = "127.0.0.1:8080"

[github]
api_url = "https://ghe.example.com/api/v3"
token = "ghp_example"
per_page = 50
enrich_timeout_ms = 1500
max_concurrent_enrichments = 10

[rate_limit]
capacity = 5
window_seconds = 10
backend = "redis"
redis_url = "redis://127.0.0.1:6379"
on_store_error = "deny"

[logging]
level = "debug"
show_target = true

[telemetry]
metrics_port = 9090
"#
    )?;

    let cfg = load_from_path(file.path())?;
    assert_eq!(cfg.listen.port(), 8080);
    assert_eq!(cfg.github.api_url, "https://ghe.example.com/api/v3");
    assert!(cfg.github.has_token());
    assert_eq!(cfg.github.per_page, 50);
    assert_eq!(cfg.github.enrich_timeout().as_millis(), 1500);
    assert_eq!(cfg.rate_limit.backend, RateLimitBackend::Redis);
    assert_eq!(cfg.rate_limit.on_store_error, StoreErrorPolicy::Deny);
    assert_eq!(cfg.rate_limit.window().as_secs(), 10);
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.telemetry.metrics_port, Some(9090));
    Ok(())
}

#[test]
fn rejects_invalid_values() {
    let cases = [
        "[github]\nper_page = 0",
        "[github]\nper_page = 101",
        "[github]\napi_url = \"not a url\"",
        "[github]\nsearch_query = \"  \"",
        "[github]\nenrich_timeout_ms = 0",
        "[github]\nmax_concurrent_enrichments = 0",
        "[rate_limit]\ncapacity = 0",
        "[rate_limit]\nwindow_seconds = 0",
        "[rate_limit]\nbackend = \"redis\"",
        "[rate_limit]\nbackend = \"memcached\"",
        "listen = \"nowhere\"",
    ];
    for toml in cases {
        assert!(load_from_str(toml).is_err(), "should reject: {toml}");
    }
}

#[test]
fn disabled_rate_limit_skips_its_checks() -> TestResult {
    let cfg = load_from_str("[rate_limit]\nenabled = false\ncapacity = 0")?;
    assert!(!cfg.rate_limit.enabled);
    Ok(())
}

#[test]
fn missing_file_is_a_config_error() {
    let err = load_from_path("/nonexistent/octoquest.toml");
    assert!(matches!(err, Err(octoquest_lib::ServiceError::Config(_))));
}
