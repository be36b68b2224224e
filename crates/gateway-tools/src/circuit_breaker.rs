//! Per-upstream circuit breaker guarding [`crate::external::HttpExternalDataClient`]
//! (§5, §11.2).
//!
//! A small `DashMap`-keyed stateful guard with a check method: a per-service
//! failure-count/trip-timestamp map.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use tracing::warn;

/// Trips after `threshold` consecutive failures against a given service key,
/// and refuses calls for `reset_after` before allowing a probe through.
pub struct CircuitBreaker {
    threshold: u32,
    reset_after: Duration,
    services: DashMap<String, ServiceState>,
}

struct ServiceState {
    consecutive_failures: AtomicU32,
    /// Unix seconds the breaker tripped at; `0` means closed.
    tripped_at: AtomicI64,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            tripped_at: AtomicI64::new(0),
        }
    }
}

impl CircuitBreaker {
    pub fn new(threshold: u32, reset_after: Duration) -> Self {
        Self {
            threshold,
            reset_after,
            services: DashMap::new(),
        }
    }

    /// Default policy: 5 consecutive failures trips a 60s open window (§5).
    pub fn with_default_policy() -> Self {
        Self::new(5, Duration::from_secs(60))
    }

    /// `true` if calls to `service` should currently be refused.
    pub fn is_open(&self, service: &str) -> bool {
        let state = self.services.entry(service.to_string()).or_default();
        let tripped_at = state.tripped_at.load(Ordering::Relaxed);
        if tripped_at == 0 {
            return false;
        }
        if now_secs() - tripped_at >= self.reset_after.as_secs() as i64 {
            state.tripped_at.store(0, Ordering::Relaxed);
            state.consecutive_failures.store(0, Ordering::Relaxed);
            return false;
        }
        true
    }

    pub fn record_success(&self, service: &str) {
        if let Some(state) = self.services.get(service) {
            state.consecutive_failures.store(0, Ordering::Relaxed);
            state.tripped_at.store(0, Ordering::Relaxed);
        }
    }

    pub fn record_failure(&self, service: &str) {
        let state = self.services.entry(service.to_string()).or_default();
        let failures = state.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.threshold {
            state.tripped_at.store(now_secs(), Ordering::Relaxed);
            warn!(service, failures, "circuit breaker tripped");
        }
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}
