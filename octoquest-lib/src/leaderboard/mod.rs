//! Leaderboard assembly and the gamified figures shown for each user.

pub mod activity;
pub mod aggregate;
pub mod ranking;
pub mod stats;

pub use activity::{contribution_days, ContributionDay};
pub use aggregate::{aggregate_top_users, AggregateOptions, EnrichedUser, TopUsers};
pub use ranking::{rank_entries, LeaderboardEntry};
pub use stats::{DerivedStats, UserStats};
