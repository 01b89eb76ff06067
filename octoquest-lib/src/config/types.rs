use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Upstream GitHub API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GitHubConfig {
    /// Base URL of a GitHub-compatible REST API
    /// Default: "https://api.github.com"
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Personal access token sent as `Authorization: token <value>`
    /// Usually supplied through the GITHUB_TOKEN environment variable instead
    #[serde(default)]
    pub token: Option<String>,
    /// User-Agent header sent upstream (GitHub rejects requests without one)
    /// Default: "octoquest"
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Search query used for the leaderboard
    /// Default: "followers:>1000"
    #[serde(default = "default_search_query")]
    pub search_query: String,
    /// Number of search results requested (GitHub caps this at 100)
    /// Default: 100
    #[serde(default = "default_per_page")]
    pub per_page: u8,
    /// Timeout for the search and single-profile requests in milliseconds
    /// Default: 10000
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Timeout for each per-user enrichment request in milliseconds
    /// A timed out enrichment degrades that record only
    /// Default: 5000
    #[serde(default = "default_enrich_timeout")]
    pub enrich_timeout_ms: u64,
    /// Maximum number of enrichment requests in flight at once
    /// Default: 100 (the whole page concurrently)
    #[serde(default = "default_max_concurrent_enrichments")]
    pub max_concurrent_enrichments: usize,
    /// How far back the commit activity lookup reaches, in days
    /// Default: 365
    #[serde(default = "default_activity_lookback_days")]
    pub activity_lookback_days: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            user_agent: default_user_agent(),
            search_query: default_search_query(),
            per_page: default_per_page(),
            request_timeout_ms: default_request_timeout(),
            enrich_timeout_ms: default_enrich_timeout(),
            max_concurrent_enrichments: default_max_concurrent_enrichments(),
            activity_lookback_days: default_activity_lookback_days(),
        }
    }
}

impl GitHubConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn enrich_timeout(&self) -> Duration {
        Duration::from_millis(self.enrich_timeout_ms)
    }

    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// Where rate limit windows are stored
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    /// In-process sliding window, only correct for a single instance
    #[default]
    Memory,
    /// Shared Redis sliding log, atomic across instances
    Redis,
}

/// What to do when the window store cannot be reached
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreErrorPolicy {
    /// Admit the request and log a warning (fail-open)
    #[default]
    Allow,
    /// Reject the request with 503 (fail-closed)
    Deny,
}

/// Rate limiting configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    /// Default: true
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Attempts allowed per client within one window
    /// Default: 30
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Rolling window length in seconds
    /// Default: 60
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Window store
    /// Default: "memory"
    #[serde(default)]
    pub backend: RateLimitBackend,
    /// Redis connection URL, required when backend = "redis"
    /// Example: "redis://127.0.0.1:6379"
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Prefix for Redis keys
    /// Default: "octoquest:ratelimit"
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Timeout for one store round trip in milliseconds
    /// Default: 250
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
    /// Behaviour when the store is unreachable
    /// Default: "allow"
    #[serde(default)]
    pub on_store_error: StoreErrorPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_capacity(),
            window_seconds: default_window_seconds(),
            backend: RateLimitBackend::default(),
            redis_url: None,
            key_prefix: default_key_prefix(),
            store_timeout_ms: default_store_timeout(),
            on_store_error: StoreErrorPolicy::default(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Logging configuration
/// Controls application-level structured logging (stdout/stderr)
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    /// Default: "info"
    /// Can be overridden at runtime via RUST_LOG environment variable
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Show module path (target) in log messages
    /// Default: false
    #[serde(default)]
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), show_target: false }
    }
}

/// Timeout configuration for the HTTP server
#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutConfig {
    /// Graceful shutdown timeout in seconds
    /// Default: 30
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_secs: u64,
    /// Total connection handling timeout in seconds
    /// Default: 300 seconds (5 minutes)
    #[serde(default = "default_connection_handling_timeout")]
    pub connection_handling_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            shutdown_secs: default_shutdown_timeout(),
            connection_handling_secs: default_connection_handling_timeout(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Observability server port (optional)
    /// If provided, serves /metrics, /health, /ready and /live on this port
    /// Default: None (disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
    /// OpenTelemetry internal log level
    /// Default: "warn"
    #[serde(default = "default_otel_log_level")]
    pub otel_log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { metrics_port: None, otel_log_level: default_otel_log_level() }
    }
}

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Default: "0.0.0.0:3000"
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub timeout: TimeoutConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            github: GitHubConfig::default(),
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig::default(),
            timeout: TimeoutConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    "octoquest".to_string()
}

fn default_search_query() -> String {
    "followers:>1000".to_string()
}

fn default_per_page() -> u8 {
    100
}

fn default_request_timeout() -> u64 {
    10000
}

fn default_enrich_timeout() -> u64 {
    5000
}

fn default_max_concurrent_enrichments() -> usize {
    100
}

fn default_activity_lookback_days() -> u32 {
    365
}

fn default_true() -> bool {
    true
}

fn default_capacity() -> u32 {
    30
}

fn default_window_seconds() -> u64 {
    60
}

fn default_key_prefix() -> String {
    "octoquest:ratelimit".to_string()
}

fn default_store_timeout() -> u64 {
    250
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_connection_handling_timeout() -> u64 {
    300
}

fn default_otel_log_level() -> String {
    "warn".to_string()
}
