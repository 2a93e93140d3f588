//! Per-client fixed-window rate limiting.
//!
//! Each key gets `capacity` requests per window. The window restarts on the
//! first request after it lapses, so a client can squeeze up to twice the
//! capacity through around a boundary; that burst is accepted in exchange
//! for O(1) state per key.
//!
//! Windows live in a [`ShardedTtlCache`] capped at `max_tracked_keys`, so a
//! flood of distinct addresses evicts the least recently seen windows
//! instead of growing the map. An evicted client simply starts a new window.

use std::net::IpAddr;
use std::time::Duration;
use tokio::time::Instant;

use super::cache::ShardedTtlCache;
use crate::config::RateLimitConfig;

/// A single fixed window.
#[derive(Debug, Clone)]
struct FixedWindow {
    window_start: Instant,
    tokens: u32,
}

impl FixedWindow {
    fn new(capacity: u32, now: Instant) -> Self {
        Self {
            window_start: now,
            tokens: capacity,
        }
    }

    fn roll(&mut self, capacity: u32, window: Duration, now: Instant) {
        if now.duration_since(self.window_start) >= window {
            self.window_start = now;
            self.tokens = capacity;
        }
    }

    fn try_acquire(&mut self, capacity: u32, window: Duration, now: Instant) -> bool {
        self.roll(capacity, window, now);
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn resets_in(&self, window: Duration, now: Instant) -> Duration {
        window.saturating_sub(now.duration_since(self.window_start))
    }
}

/// Outcome of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    /// Tokens left in the current window.
    pub remaining: u32,
    /// Time until the window resets, set when the request was refused.
    pub retry_after: Option<Duration>,
}

/// Fixed-window limiter keyed by client address.
pub struct RateLimiter {
    buckets: ShardedTtlCache<IpAddr, FixedWindow>,
    capacity: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration, max_tracked_keys: usize) -> Self {
        Self {
            buckets: ShardedTtlCache::new(max_tracked_keys, window),
            capacity,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window(), config.max_tracked_keys)
    }

    /// Debit one token for `key`.
    pub fn admit(&self, key: IpAddr) -> Admission {
        let now = Instant::now();
        let (capacity, window) = (self.capacity, self.window);

        self.buckets.upsert(
            key,
            || FixedWindow::new(capacity, now),
            |bucket| {
                if bucket.try_acquire(capacity, window, now) {
                    Admission {
                        allowed: true,
                        remaining: bucket.tokens,
                        retry_after: None,
                    }
                } else {
                    Admission {
                        allowed: false,
                        remaining: 0,
                        retry_after: Some(bucket.resets_in(window, now)),
                    }
                }
            },
        )
    }

    /// Give back a token debited in the current window.
    pub fn refund(&self, key: IpAddr) {
        let now = Instant::now();
        self.buckets.modify(&key, |bucket| {
            if now.duration_since(bucket.window_start) < self.window {
                bucket.tokens = (bucket.tokens + 1).min(self.capacity);
            }
        });
    }

    /// Tokens left for `key` without debiting.
    pub fn remaining(&self, key: IpAddr) -> u32 {
        let now = Instant::now();
        match self.buckets.peek(&key) {
            Some(bucket) if now.duration_since(bucket.window_start) < self.window => bucket.tokens,
            _ => self.capacity,
        }
    }

    /// Drop windows idle for a full window; they would reset on next use anyway.
    pub fn cleanup(&self) -> usize {
        self.buckets.purge_expired()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Most keys tracked at once.
    pub fn capacity(&self) -> usize {
        self.buckets.capacity()
    }
}
