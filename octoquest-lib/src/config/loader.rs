use std::fs;
use std::path::Path;

use crate::config::{Config, RateLimitBackend};
use crate::error::{Result, ServiceError};

/// GitHub's search endpoint never returns more than this many items per page
pub const MAX_PER_PAGE: u8 = 100;

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| ServiceError::Config(format!("Failed to read config file: {e}")))?;
    load_from_str(&txt)
}

pub fn load_from_str(txt: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(txt)
        .map_err(|e| ServiceError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> Result<()> {
    let github = &cfg.github;

    url::Url::parse(&github.api_url)
        .map_err(|e| ServiceError::Config(format!("Invalid github.api_url: {e}")))?;

    if github.per_page == 0 || github.per_page > MAX_PER_PAGE {
        return Err(ServiceError::Config(format!(
            "github.per_page must be between 1 and {MAX_PER_PAGE}"
        )));
    }
    if github.search_query.trim().is_empty() {
        return Err(ServiceError::Config("github.search_query cannot be empty".into()));
    }
    if github.user_agent.trim().is_empty() {
        return Err(ServiceError::Config("github.user_agent cannot be empty".into()));
    }
    if github.request_timeout_ms == 0 {
        return Err(ServiceError::Config("github.request_timeout_ms must be > 0".into()));
    }
    if github.enrich_timeout_ms == 0 {
        return Err(ServiceError::Config("github.enrich_timeout_ms must be > 0".into()));
    }
    if github.max_concurrent_enrichments == 0 {
        return Err(ServiceError::Config(
            "github.max_concurrent_enrichments must be > 0".into(),
        ));
    }

    let rate_limit = &cfg.rate_limit;
    if rate_limit.enabled {
        if rate_limit.capacity == 0 {
            return Err(ServiceError::Config("rate_limit.capacity must be > 0".into()));
        }
        if rate_limit.window_seconds == 0 {
            return Err(ServiceError::Config("rate_limit.window_seconds must be > 0".into()));
        }
        if rate_limit.store_timeout_ms == 0 {
            return Err(ServiceError::Config("rate_limit.store_timeout_ms must be > 0".into()));
        }
        if rate_limit.backend == RateLimitBackend::Redis
            && rate_limit.redis_url.as_deref().is_none_or(|u| u.trim().is_empty())
        {
            return Err(ServiceError::Config(
                "rate_limit.redis_url is required when backend = \"redis\"".into(),
            ));
        }
    }

    Ok(())
}
