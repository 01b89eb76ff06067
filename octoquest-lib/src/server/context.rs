use std::sync::Arc;

use crate::config::GitHubConfig;
use crate::error::Result;
use crate::github::GitHubClient;
use crate::leaderboard::AggregateOptions;
use crate::security::RateLimitManager;
use crate::telemetry::Metrics;

/// State shared by every request
pub struct AppContext {
    pub github: GitHubClient,
    pub github_config: GitHubConfig,
    pub aggregate: AggregateOptions,
    pub rate_limiter: Option<Arc<RateLimitManager>>,
    pub metrics: Option<Arc<Metrics>>,
}

impl AppContext {
    pub fn new(
        github_config: GitHubConfig,
        rate_limiter: Option<Arc<RateLimitManager>>,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<Self> {
        let github = GitHubClient::new(&github_config)?;
        let aggregate = AggregateOptions::from(&github_config);
        Ok(Self { github, github_config, aggregate, rate_limiter, metrics })
    }
}
