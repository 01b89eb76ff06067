//! Rate limit decisions and the in-process window store.

use ahash::AHashMap;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed to proceed.
    Allowed {
        /// Maximum number of attempts allowed in the window
        limit: u64,
        /// Number of attempts remaining in the current window
        remaining: u64,
    },
    /// Request is rate limited and should be rejected.
    Limited {
        /// Maximum number of attempts allowed in the window
        limit: u64,
        /// Time until the caller's quota is restored
        reset_after: Duration,
    },
}

impl RateLimitResult {
    /// Build a decision from the caller's attempt count, which already includes
    /// the attempt being decided.
    pub fn from_count(count: u64, limit: u64, reset_after: Duration) -> Self {
        if count > limit {
            RateLimitResult::Limited { limit, reset_after }
        } else {
            RateLimitResult::Allowed { limit, remaining: limit - count }
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimitResult::Limited { .. })
    }

    pub fn limit(&self) -> u64 {
        match self {
            RateLimitResult::Allowed { limit, .. } => *limit,
            RateLimitResult::Limited { limit, .. } => *limit,
        }
    }

    /// Remaining attempts; always 0 when limited.
    pub fn remaining(&self) -> u64 {
        match self {
            RateLimitResult::Allowed { remaining, .. } => *remaining,
            RateLimitResult::Limited { .. } => 0,
        }
    }

    pub fn reset_after(&self) -> Option<Duration> {
        match self {
            RateLimitResult::Limited { reset_after, .. } => Some(*reset_after),
            _ => None,
        }
    }
}

/// In-process sliding log limiter.
///
/// Each key keeps the timestamps of its most recent `capacity` attempts. An
/// attempt is limited exactly when `capacity` earlier attempts of the same key
/// are still inside the rolling window, so at most `capacity` attempts are
/// admitted in any window of length `window`. Keys idle for a whole window
/// are swept at most once per window.
///
/// # Example
/// ```ignore
/// use std::time::Duration;
/// use octoquest_lib::security::rate_limit::RateLimiter;
///
/// let limiter = RateLimiter::new(30, Duration::from_secs(60));
/// assert!(limiter.check(&"198.51.100.4").is_allowed());
/// ```
pub struct RateLimiter {
    state: Mutex<WindowLog>,
    capacity: u64,
    window: Duration,
}

struct WindowLog {
    attempts: AHashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

impl RateLimiter {
    /// `capacity` attempts are admitted per key within any rolling `window`.
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            state: Mutex::new(WindowLog { attempts: AHashMap::new(), last_sweep: Instant::now() }),
            capacity: u64::from(capacity),
            window,
        }
    }

    /// Record one attempt for `key` and decide on it.
    ///
    /// Every call counts, including the ones that end up limited.
    pub fn check<K: AsRef<str> + ?Sized>(&self, key: &K) -> RateLimitResult {
        self.check_at(key.as_ref(), Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitResult {
        // the log holds plain timestamps, a poisoned lock leaves it consistent
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if now.saturating_duration_since(state.last_sweep) >= self.window {
            self.sweep(&mut state.attempts, now);
            state.last_sweep = now;
        }

        match state.attempts.get_mut(key) {
            Some(log) => self.record(log, now),
            None => {
                let mut log = VecDeque::new();
                let result = self.record(&mut log, now);
                state.attempts.insert(key.to_owned(), log);
                result
            }
        }
    }

    fn record(&self, log: &mut VecDeque<Instant>, now: Instant) -> RateLimitResult {
        while log.front().is_some_and(|t| self.expired(*t, now)) {
            log.pop_front();
        }

        let count = log.len() as u64 + 1;
        log.push_back(now);
        // older entries can no longer change a decision
        while log.len() as u64 > self.capacity {
            log.pop_front();
        }

        let reset_after = match log.front() {
            Some(oldest) if count > self.capacity => {
                self.window.saturating_sub(now.saturating_duration_since(*oldest))
            }
            _ => self.window,
        };
        RateLimitResult::from_count(count, self.capacity, reset_after)
    }

    fn expired(&self, at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(at) >= self.window
    }

    fn sweep(&self, attempts: &mut AHashMap<String, VecDeque<Instant>>, now: Instant) {
        attempts.retain(|_, log| log.back().is_some_and(|t| !self.expired(*t, now)));
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).attempts.len()
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
