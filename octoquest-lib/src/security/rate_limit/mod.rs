//! Rate limiting for the leaderboard API.
//!
//! Every rate limited endpoint records one attempt per request against a
//! sliding window keyed by client IP (30 attempts per rolling minute by
//! default). Two window stores are available:
//!
//! - **memory** ([`RateLimiter`]): exact per-key sliding log of the most
//!   recent attempts. Correct for one instance.
//! - **redis** ([`RedisWindow`]): sorted-set sliding log updated by one Lua
//!   script, shared by every instance pointing at the same server.
//!
//! [`RateLimitManager`] picks the store from configuration and applies the
//! store failure policy (`allow` or `deny`).
//!
//! # Configuration
//!
//! ```toml
//! [rate_limit]
//! capacity = 30
//! window_seconds = 60
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//! on_store_error = "allow"
//! ```

mod limiter;
mod manager;
mod redis_store;

pub use limiter::{RateLimitResult, RateLimiter};
pub use manager::{RateLimitManager, WindowStore};
pub use redis_store::RedisWindow;
