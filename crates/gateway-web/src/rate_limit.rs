//! Per-teacher token-bucket rate limiter (§5, §6, §11.2).
//!
//! Shaped after `gateway_tools::CircuitBreaker`'s `DashMap`-keyed stateful
//! guard, generalized from a failure-count map to a refilling token bucket
//! keyed on `teacher_id`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

/// Default policy (§6): 5 starts/minute, burst 10.
pub const DEFAULT_REFILL_PER_MINUTE: f64 = 5.0;
pub const DEFAULT_BURST: f64 = 10.0;

struct Bucket {
    tokens: f64,
    last_refill: f64,
}

/// A token bucket per `teacher_id`. `try_acquire` is the only mutating
/// entry point; it refills lazily on access rather than on a background
/// timer, so an idle teacher never costs a scheduled tick.
pub struct RateLimiter {
    refill_per_second: f64,
    burst: f64,
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new(refill_per_minute: f64, burst: f64) -> Self {
        Self {
            refill_per_second: refill_per_minute / 60.0,
            burst,
            buckets: DashMap::new(),
        }
    }

    pub fn with_default_policy() -> Self {
        Self::new(DEFAULT_REFILL_PER_MINUTE, DEFAULT_BURST)
    }

    /// Attempt to consume one token for `teacher_id`. Returns `true` if the
    /// request may proceed.
    pub fn try_acquire(&self, teacher_id: &str) -> bool {
        let now = now_secs();
        let mut entry = self
            .buckets
            .entry(teacher_id.to_owned())
            .or_insert_with(|| Bucket { tokens: self.burst, last_refill: now });

        let elapsed = (now - entry.last_refill).max(0.0);
        entry.tokens = (entry.tokens + elapsed * self.refill_per_second).min(self.burst);
        entry.last_refill = now;

        if entry.tokens >= 1.0 {
            entry.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
}
