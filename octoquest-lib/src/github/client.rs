//! GitHub API client
//!
//! Minimal client for the three endpoints the leaderboard needs: user search,
//! user profile and the public event feed.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::models::{SearchResponse, UserEvent, UserProfile};
use crate::config::GitHubConfig;
use crate::error::{Result, ServiceError};

const GITHUB_JSON: &str = "application/vnd.github+json";

/// Failure of one upstream call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("{endpoint} answered with status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("{endpoint} not found")]
    NotFound { endpoint: String },

    #[error("could not decode {endpoint} response: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("{endpoint} did not answer within {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("invalid upstream URL: {0}")]
    InvalidUrl(String),
}

impl UpstreamError {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Transport { .. } => "transport",
            UpstreamError::Status { .. } => "status",
            UpstreamError::NotFound { .. } => "not_found",
            UpstreamError::Decode { .. } => "decode",
            UpstreamError::Timeout { .. } => "timeout",
            UpstreamError::InvalidUrl(_) => "invalid_url",
        }
    }
}

/// GitHub REST API client
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: Url,
}

impl GitHubClient {
    /// Build a client from configuration. The token, when present, is sent as
    /// `Authorization: token <value>` on every request.
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));

        if let Some(token) = config.token.as_deref().filter(|t| !t.trim().is_empty()) {
            let mut auth_val = HeaderValue::from_str(&format!("token {}", token.trim()))
                .map_err(|e| ServiceError::Config(format!("Invalid GitHub token: {e}")))?;
            auth_val.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_val);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ServiceError::Client(format!("Failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(&config.api_url)
            .map_err(|e| ServiceError::Config(format!("Invalid github.api_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::Config(format!(
                "github.api_url cannot be used as a base URL: {}",
                config.api_url
            )));
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `GET /search/users?q=<query>&sort=followers&order=desc&per_page=<per_page>`
    pub async fn search_users(
        &self,
        query: &str,
        per_page: u8,
    ) -> std::result::Result<SearchResponse, UpstreamError> {
        let mut url = self.endpoint(&["search", "users"])?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("sort", "followers")
            .append_pair("order", "desc")
            .append_pair("per_page", &per_page.to_string());
        self.get_json(url, "search/users").await
    }

    /// `GET /users/{login}`, decoded into the fields used for enrichment
    pub async fn user_profile(
        &self,
        login: &str,
    ) -> std::result::Result<UserProfile, UpstreamError> {
        let url = self.endpoint(&["users", login])?;
        self.get_json(url, "users/{login}").await
    }

    /// `GET /users/{login}`, returned verbatim
    pub async fn user_profile_raw(
        &self,
        login: &str,
    ) -> std::result::Result<serde_json::Value, UpstreamError> {
        let url = self.endpoint(&["users", login])?;
        self.get_json(url, "users/{login}").await
    }

    /// `GET /users/{login}/events?per_page=<per_page>`
    pub async fn user_events(
        &self,
        login: &str,
        per_page: u8,
    ) -> std::result::Result<Vec<UserEvent>, UpstreamError> {
        let mut url = self.endpoint(&["users", login, "events"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &per_page.to_string());
        self.get_json(url, "users/{login}/events").await
    }

    fn endpoint(&self, segments: &[&str]) -> std::result::Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        endpoint: &str,
    ) -> std::result::Result<T, UpstreamError> {
        let start = Instant::now();
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport_error(endpoint, &e))?;

        let status = resp.status();
        debug!(
            endpoint,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "upstream response"
        );

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound { endpoint: endpoint.to_string() });
        }
        if !status.is_success() {
            return Err(UpstreamError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        resp.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                timeout_error(endpoint, None)
            } else {
                UpstreamError::Decode { endpoint: endpoint.to_string(), reason: e.to_string() }
            }
        })
    }
}

fn classify_transport_error(endpoint: &str, e: &reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        timeout_error(endpoint, None)
    } else {
        UpstreamError::Transport { endpoint: endpoint.to_string(), reason: e.to_string() }
    }
}

/// Timeout error for `endpoint`; `timeout` is the budget that ran out when known.
pub(crate) fn timeout_error(endpoint: &str, timeout: Option<Duration>) -> UpstreamError {
    UpstreamError::Timeout {
        endpoint: endpoint.to_string(),
        timeout_ms: timeout.map(|t| t.as_millis() as u64).unwrap_or_default(),
    }
}
