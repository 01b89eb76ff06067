use serde::Serialize;

use crate::github::UserProfile;

/// Gamified figures derived from a profile's public counts.
///
/// All four are display heuristics, not measured activity: `level` mixes the
/// repository and follower counts, the other three scale the repository count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStats {
    pub level: u64,
    pub commits: u64,
    pub pull_requests: u64,
    pub issues: u64,
}

impl DerivedStats {
    /// Derive stats from public repository and follower counts.
    ///
    /// - `level = floor((2 * repos + 0.5 * followers) / 10)`
    /// - `commits = repos * 50`
    /// - `pull_requests = floor(repos * 0.7)`
    /// - `issues = floor(repos * 1.2)`
    ///
    /// Integer arithmetic keeps the floors exact; results saturate at `u64::MAX`.
    pub fn derive(public_repos: u64, followers: u64) -> Self {
        let r = u128::from(public_repos);
        let f = u128::from(followers);
        Self {
            level: saturate((4 * r + f) / 20),
            commits: saturate(r * 50),
            pull_requests: saturate(r * 7 / 10),
            issues: saturate(r * 12 / 10),
        }
    }
}

/// Profile counts plus their derived stats, as served by `/user-stats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub login: String,
    pub avatar_url: Option<String>,
    pub public_repos: u64,
    pub followers: u64,
    #[serde(flatten)]
    pub stats: DerivedStats,
}

impl From<UserProfile> for UserStats {
    /// Missing counts are treated as zero.
    fn from(profile: UserProfile) -> Self {
        let public_repos = profile.public_repos.unwrap_or_default();
        let followers = profile.followers.unwrap_or_default();
        Self {
            login: profile.login,
            avatar_url: profile.avatar_url,
            public_repos,
            followers,
            stats: DerivedStats::derive(public_repos, followers),
        }
    }
}

fn saturate(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
