#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod github;
pub mod leaderboard;
pub mod security;
pub mod server;
pub mod telemetry;

pub use config::{load_from_path, Config};
pub use error::{Result, ServiceError};
pub use github::GitHubClient;
pub use leaderboard::{aggregate_top_users, DerivedStats, EnrichedUser};
pub use server::run;
