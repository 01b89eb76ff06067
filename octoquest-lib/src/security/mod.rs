pub mod client_ip;
pub mod rate_limit;

pub use client_ip::{client_key, FALLBACK_CLIENT_IP};
pub use rate_limit::{RateLimitManager, RateLimitResult, RateLimiter};
