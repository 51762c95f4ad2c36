//! Provider health bookkeeping.
//!
//! Failure counters and the skip decision are tracked with atomics rather than a mutex: the
//! router reads skip state on every query's hot path, and eventual consistency there is fine.
//! Writes use `Release`, reads use `Acquire`, matching this crate's lock-free health-state idiom.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Tracks a single provider's recent failure rate and cool-down state.
pub struct ProviderHealth {
    failure_count: AtomicU32,
    window_start_ms: AtomicU64,
    skipped: AtomicBool,
    skip_until_ms: AtomicU64,
    max_failures: u32,
    window_ms: u64,
    cooldown_ms: u64,
    /// Set once and never cleared: the local provider's "permanently skipped after first
    /// failure" rule is stronger than the sliding-window rule used by the other providers.
    permanently_skipped: AtomicBool,
}

impl ProviderHealth {
    /// Creates a health tracker with a failure-rate threshold, sliding window, and cool-down.
    pub fn new(max_failures: u32, window_ms: u64, cooldown_ms: u64) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            window_start_ms: AtomicU64::new(now_ms()),
            skipped: AtomicBool::new(false),
            skip_until_ms: AtomicU64::new(0),
            max_failures,
            window_ms,
            cooldown_ms,
            permanently_skipped: AtomicBool::new(false),
        }
    }

    /// Records a successful call, resetting the failure window.
    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Release);
        self.window_start_ms.store(now_ms(), Ordering::Release);
    }

    /// Records a failed call, possibly tripping the cool-down skip.
    pub fn record_failure(&self) {
        let now = now_ms();
        let window_start = self.window_start_ms.load(Ordering::Acquire);
        if now.saturating_sub(window_start) > self.window_ms {
            // Window elapsed: start a fresh one at this failure.
            self.window_start_ms.store(now, Ordering::Release);
            self.failure_count.store(1, Ordering::Release);
            return;
        }

        let count = self.failure_count.fetch_add(1, Ordering::Release) + 1;
        if count >= self.max_failures {
            self.skip_until_ms
                .store(now + self.cooldown_ms, Ordering::Release);
            self.skipped.store(true, Ordering::Release);
        }
    }

    /// Marks the provider as permanently skipped for this process's lifetime (used by the
    /// local-model provider: a first-call load failure is never retried).
    pub fn mark_permanently_skipped(&self) {
        self.permanently_skipped.store(true, Ordering::Release);
    }

    /// Returns `true` if the provider should be skipped right now.
    pub fn is_skipped(&self) -> bool {
        if self.permanently_skipped.load(Ordering::Acquire) {
            return true;
        }
        if !self.skipped.load(Ordering::Acquire) {
            return false;
        }
        let now = now_ms();
        if now >= self.skip_until_ms.load(Ordering::Acquire) {
            // Cool-down elapsed: clear the flag so the next failure re-evaluates the window.
            self.skipped.store(false, Ordering::Release);
            self.failure_count.store(0, Ordering::Release);
            false
        } else {
            true
        }
    }

    /// Current failure count within the active window, for metrics.
    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_after_threshold() {
        let health = ProviderHealth::new(3, 60_000, 1_000);
        assert!(!health.is_skipped());
        health.record_failure();
        health.record_failure();
        assert!(!health.is_skipped());
        health.record_failure();
        assert!(health.is_skipped());
    }

    #[test]
    fn success_resets_window() {
        let health = ProviderHealth::new(2, 60_000, 1_000);
        health.record_failure();
        health.record_success();
        assert_eq!(health.failure_count(), 0);
        health.record_failure();
        assert!(!health.is_skipped());
    }

    #[test]
    fn permanent_skip_survives_everything() {
        let health = ProviderHealth::new(100, 60_000, 1_000);
        health.mark_permanently_skipped();
        assert!(health.is_skipped());
        health.record_success();
        assert!(health.is_skipped());
    }
}
