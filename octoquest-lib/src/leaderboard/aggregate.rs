//! Top-users aggregation: one search, then one profile lookup per result.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashSet;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::GitHubConfig;
use crate::github::client::timeout_error;
use crate::github::{GitHubClient, UpstreamError, UserProfile, UserSummary};
use crate::telemetry::Metrics;

/// Knobs of one aggregation run
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub search_query: String,
    pub per_page: u8,
    pub enrich_timeout: Duration,
    pub max_concurrent: usize,
}

impl From<&GitHubConfig> for AggregateOptions {
    fn from(config: &GitHubConfig) -> Self {
        Self {
            search_query: config.search_query.clone(),
            per_page: config.per_page,
            enrich_timeout: config.enrich_timeout(),
            max_concurrent: config.max_concurrent_enrichments,
        }
    }
}

/// A search result merged with its profile counts.
///
/// When the profile lookup failed the counts are `null` and
/// `enrichment_error` says why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedUser {
    pub id: u64,
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
    pub public_repos: Option<u64>,
    pub followers: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment_error: Option<String>,
}

impl EnrichedUser {
    fn enriched(summary: UserSummary, profile: UserProfile) -> Self {
        Self {
            id: summary.id,
            login: summary.login,
            avatar_url: summary.avatar_url,
            html_url: summary.html_url,
            public_repos: profile.public_repos,
            followers: profile.followers,
            enrichment_error: None,
        }
    }

    fn degraded(summary: UserSummary, reason: String) -> Self {
        Self {
            id: summary.id,
            login: summary.login,
            avatar_url: summary.avatar_url,
            html_url: summary.html_url,
            public_repos: None,
            followers: None,
            enrichment_error: Some(reason),
        }
    }

    pub fn is_enriched(&self) -> bool {
        self.enrichment_error.is_none()
    }
}

/// Body of `GET /top-users`
#[derive(Debug, Clone, Serialize)]
pub struct TopUsers {
    pub items: Vec<EnrichedUser>,
}

impl TopUsers {
    pub fn failed_count(&self) -> usize {
        self.items.iter().filter(|u| !u.is_enriched()).count()
    }
}

/// Build the leaderboard.
///
/// The search call must succeed; any failure there fails the whole run.
/// Profile lookups run concurrently (bounded by `max_concurrent`), each under
/// its own timeout, and a failed lookup only degrades its own record. Output
/// order is the search order.
pub async fn aggregate_top_users(
    client: &GitHubClient,
    options: &AggregateOptions,
    metrics: Option<&Arc<Metrics>>,
) -> Result<TopUsers, UpstreamError> {
    let started = Instant::now();
    let search = client.search_users(&options.search_query, options.per_page).await;
    if let Some(m) = metrics {
        m.record_upstream("search/users", started, &search);
    }
    let search = search?;

    let summaries = unique_by_id(search.items, usize::from(options.per_page));
    debug!(
        total_count = search.total_count,
        users = summaries.len(),
        "search returned, enriching profiles"
    );

    let items = enrich_all(client, summaries, options, metrics).await;
    let top = TopUsers { items };

    let failed = top.failed_count();
    if failed > 0 {
        warn!(failed, total = top.items.len(), "some profiles could not be enriched");
    }
    if let Some(m) = metrics {
        m.record_leaderboard(top.items.len(), failed);
    }
    info!(
        users = top.items.len(),
        failed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "leaderboard assembled"
    );

    Ok(top)
}

/// Keep the first occurrence of every id, at most `limit` entries.
fn unique_by_id(items: Vec<UserSummary>, limit: usize) -> Vec<UserSummary> {
    let mut seen = AHashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|u| seen.insert(u.id))
        .take(limit)
        .collect()
}

async fn enrich_all(
    client: &GitHubClient,
    summaries: Vec<UserSummary>,
    options: &AggregateOptions,
    metrics: Option<&Arc<Metrics>>,
) -> Vec<EnrichedUser> {
    let semaphore = Arc::new(Semaphore::new(options.max_concurrent.max(1)));
    let mut tasks = JoinSet::new();

    for (rank, summary) in summaries.iter().enumerate() {
        let client = client.clone();
        let login = summary.login.clone();
        let semaphore = Arc::clone(&semaphore);
        let timeout = options.enrich_timeout;
        let metrics = metrics.cloned();

        tasks.spawn(async move {
            // the semaphore is never closed
            let _permit = semaphore.acquire_owned().await.ok();
            let started = Instant::now();
            let result = match tokio::time::timeout(timeout, client.user_profile(&login)).await {
                Ok(result) => result,
                Err(_) => Err(timeout_error("users/{login}", Some(timeout))),
            };
            if let Some(m) = metrics {
                m.record_upstream("users/{login}", started, &result);
            }
            (rank, result)
        });
    }

    let mut profiles: Vec<Option<Result<UserProfile, UpstreamError>>> =
        (0..summaries.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((rank, result)) => profiles[rank] = Some(result),
            Err(e) => warn!(error = %e, "enrichment task failed"),
        }
    }

    summaries
        .into_iter()
        .zip(profiles)
        .map(|(summary, profile)| match profile {
            Some(Ok(profile)) => EnrichedUser::enriched(summary, profile),
            Some(Err(e)) => {
                debug!(login = %summary.login, error = %e, "enrichment failed");
                EnrichedUser::degraded(summary, e.to_string())
            }
            None => EnrichedUser::degraded(summary, "enrichment task aborted".to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: u64, login: &str) -> UserSummary {
        UserSummary {
            id,
            login: login.to_string(),
            avatar_url: format!("https://avatars.example/{id}"),
            html_url: format!("https://github.com/{login}"),
        }
    }

    #[test]
    fn duplicate_ids_keep_first_rank() {
        let items = vec![summary(1, "a"), summary(2, "b"), summary(1, "a"), summary(3, "c")];
        let logins: Vec<_> = unique_by_id(items, 100).into_iter().map(|u| u.login).collect();
        assert_eq!(logins, ["a", "b", "c"]);
    }

    #[test]
    fn results_are_capped_at_page_size() {
        let items = (0..10).map(|i| summary(i, &format!("u{i}"))).collect();
        assert_eq!(unique_by_id(items, 4).len(), 4);
    }

    #[test]
    fn degraded_record_serializes_null_counts() {
        let user = EnrichedUser::degraded(summary(7, "g"), "timeout".into());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json["public_repos"].is_null());
        assert!(json["followers"].is_null());
        assert_eq!(json["enrichment_error"], "timeout");
    }

    #[test]
    fn enriched_record_omits_error_field() {
        let profile = UserProfile {
            login: "g".into(),
            avatar_url: None,
            public_repos: Some(10),
            followers: Some(2000),
        };
        let user = EnrichedUser::enriched(summary(7, "g"), profile);
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["public_repos"], 10);
        assert_eq!(json["followers"], 2000);
        assert!(json.get("enrichment_error").is_none());
    }
}
