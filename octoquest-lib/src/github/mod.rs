//! GitHub REST API access

pub mod client;
pub mod models;

pub use client::{GitHubClient, UpstreamError};
pub use models::{EventPayload, SearchResponse, UserEvent, UserProfile, UserSummary};
