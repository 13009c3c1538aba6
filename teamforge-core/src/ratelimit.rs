//! ABOUTME: Per-source token-bucket rate limiting shared by both RPC surfaces
//! ABOUTME: Mirrors the capacity/refill/burst shape of a classic token bucket limiter

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Static configuration for one bucket.
#[derive(Debug, Clone, Copy)]
pub struct TokenBucketConfig {
    pub capacity: u32,
    pub refill_rate: f64,
    pub refill_interval: Duration,
    pub burst_capacity: u32,
}

impl TokenBucketConfig {
    /// At least 100 requests/minute per source, with a small burst allowance.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self {
            capacity: requests_per_minute,
            refill_rate: requests_per_minute as f64,
            refill_interval: Duration::from_secs(60),
            burst_capacity: requests_per_minute / 10,
        }
    }
}

struct TokenBucket {
    tokens: f64,
    config: TokenBucketConfig,
    last_refill: DateTime<Utc>,
}

impl TokenBucket {
    fn new(config: TokenBucketConfig) -> Self {
        let total = (config.capacity + config.burst_capacity) as f64;
        Self {
            tokens: total,
            config,
            last_refill: Utc::now(),
        }
    }

    fn refill(&mut self) {
        let now = Utc::now();
        let elapsed = now.signed_duration_since(self.last_refill);
        let elapsed = elapsed.to_std().unwrap_or(Duration::ZERO);
        if elapsed >= self.config.refill_interval {
            let intervals = elapsed.as_secs_f64() / self.config.refill_interval.as_secs_f64();
            let total_capacity = (self.config.capacity + self.config.burst_capacity) as f64;
            self.tokens = (self.tokens + intervals * self.config.refill_rate).min(total_capacity);
            self.last_refill = now;
        }
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// One bucket per source key (typically a source IP), created lazily on first request.
pub struct RateLimiter {
    config: TokenBucketConfig,
    buckets: DashMap<String, TokenBucket>,
}

impl RateLimiter {
    pub fn new(config: TokenBucketConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    /// Returns `true` if `source` may proceed, consuming one token if so.
    pub fn check(&self, source: &str) -> bool {
        let mut bucket = self
            .buckets
            .entry(source.to_string())
            .or_insert_with(|| TokenBucket::new(self.config));
        bucket.try_acquire()
    }
}
