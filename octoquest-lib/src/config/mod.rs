mod loader;
mod types;

pub use loader::{load_from_path, load_from_str, validate_config, MAX_PER_PAGE};
pub use types::{
    Config, GitHubConfig, LoggingConfig, RateLimitBackend, RateLimitConfig, StoreErrorPolicy,
    TelemetryConfig, TimeoutConfig,
};
