use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of the user search endpoint (`/search/users`)
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total_count: u64,
    pub items: Vec<UserSummary>,
}

/// One user as returned by the search endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserSummary {
    pub id: u64,
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
}

/// The profile fields read from `/users/{login}`
///
/// The single-user lookup passes the full profile through untouched; this view
/// only exists for enrichment and stats.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub public_repos: Option<u64>,
    #[serde(default)]
    pub followers: Option<u64>,
}

/// One entry of `/users/{login}/events`
#[derive(Debug, Clone, Deserialize)]
pub struct UserEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: EventPayload,
}

/// The part of an event payload used for push events
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub commits: Vec<serde_json::Value>,
}

impl UserEvent {
    pub const PUSH: &'static str = "PushEvent";

    pub fn is_push(&self) -> bool {
        self.kind == Self::PUSH
    }

    /// Commits carried by a push event; `size` when present, else the commit list length.
    pub fn commit_count(&self) -> u64 {
        self.payload
            .size
            .unwrap_or(self.payload.commits.len() as u64)
    }
}
