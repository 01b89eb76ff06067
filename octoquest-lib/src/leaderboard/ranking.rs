use serde::Serialize;

use super::aggregate::EnrichedUser;
use super::stats::DerivedStats;

/// One row of the rendered leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub login: String,
    pub avatar_url: String,
    /// `None` when the profile counts are unknown
    #[serde(flatten)]
    pub stats: Option<DerivedStats>,
}

impl LeaderboardEntry {
    fn from_user(rank: usize, user: &EnrichedUser) -> Self {
        let stats = match (user.public_repos, user.followers) {
            (Some(repos), Some(followers)) => Some(DerivedStats::derive(repos, followers)),
            _ => None,
        };
        Self { rank, login: user.login.clone(), avatar_url: user.avatar_url.clone(), stats }
    }
}

/// Rank the first `limit` users, keeping search order. Ranks start at 1.
pub fn rank_entries(users: &[EnrichedUser], limit: usize) -> Vec<LeaderboardEntry> {
    users
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, user)| LeaderboardEntry::from_user(i + 1, user))
        .collect()
}
