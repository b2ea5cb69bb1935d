//! # Circuit Breaker
//!
//! Per-instance sliding-window failure tracking. Each breaker has two states:
//!
//! - **Closed** (`open = false`): the initial state; failures accumulate.
//! - **Open** (`open = true`): terminal. A tripped instance is removed from
//!   the registry, and a fresh breaker is only created if the same instance
//!   id registers again. There is no half-open retry.
//!
//! The transition Closed -> Open happens exactly once, when the number of
//! failures inside the sliding window reaches the threshold. A successful
//! probe at any time resets the breaker to Closed with an empty failure
//! history; prior failures earn no partial credit.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Failure tracker for a single service instance
///
/// Created lazily on the instance's first probe failure and destroyed when
/// the breaker trips, the instance's heartbeat expires, or the instance is
/// explicitly deregistered.
#[derive(Debug)]
pub struct CircuitBreakerState {
    instance_id: String,
    failure_timestamps: Vec<Instant>,
    open: bool,
}

impl CircuitBreakerState {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            failure_timestamps: Vec::new(),
            open: false,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Record a failure at the current time
    pub fn record_failure(&mut self) {
        self.failure_timestamps.push(Instant::now());
    }

    /// Drop failures older than `window`, measured back from now
    pub fn remove_old_failures(&mut self, window: Duration) {
        let now = Instant::now();
        self.failure_timestamps
            .retain(|timestamp| now.duration_since(*timestamp) <= window);
    }

    /// Number of failures still inside the window
    pub fn recent_failure_count(&self) -> u32 {
        self.failure_timestamps.len() as u32
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Open the breaker; returns whether this call performed the transition
    ///
    /// The guard makes a trip fire exactly once even if further failures
    /// arrive before the instance is removed.
    pub fn trip(&mut self) -> bool {
        if self.open {
            false
        } else {
            self.open = true;
            true
        }
    }

    /// Clear all failures and close the breaker
    pub fn reset(&mut self) {
        self.failure_timestamps.clear();
        self.open = false;
    }
}

/// Outcome of recording a probe failure against an instance's breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureVerdict {
    /// Failures remaining in the window after pruning, including this one
    pub recent_failures: u32,
    /// True exactly once per breaker: on the Closed -> Open transition
    pub tripped: bool,
}

/// Concurrent map of per-instance circuit breakers
///
/// Keyed by instance id with atomic get-or-create semantics, so a first
/// failure racing a concurrent trip, reset, or removal is safe: every
/// mutation happens under the entry lock for that key.
pub struct BreakerMap {
    breakers: DashMap<String, CircuitBreakerState>,
}

impl BreakerMap {
    pub fn new() -> Self {
        Self {
            breakers: DashMap::new(),
        }
    }

    /// Record a failure for an instance and decide whether it trips
    ///
    /// Creates the breaker on first failure, appends a failure timestamp,
    /// prunes everything older than `window`, and opens the breaker when the
    /// remaining count reaches `threshold`. All under one entry lock.
    pub fn record_failure(
        &self,
        instance_id: &str,
        window: Duration,
        threshold: u32,
    ) -> FailureVerdict {
        let mut breaker = self
            .breakers
            .entry(instance_id.to_string())
            .or_insert_with(|| CircuitBreakerState::new(instance_id));

        breaker.record_failure();
        breaker.remove_old_failures(window);
        let recent_failures = breaker.recent_failure_count();

        let tripped = if recent_failures >= threshold {
            breaker.trip()
        } else {
            false
        };

        FailureVerdict {
            recent_failures,
            tripped,
        }
    }

    /// Reset an instance's breaker after a successful probe, if one exists
    pub fn reset(&self, instance_id: &str) {
        if let Some(mut breaker) = self.breakers.get_mut(instance_id) {
            breaker.reset();
        }
    }

    /// Discard an instance's breaker entirely (trip, expiry, deregistration)
    pub fn remove(&self, instance_id: &str) {
        self.breakers.remove(instance_id);
    }

    /// Current failure count for an instance, zero when no breaker exists
    pub fn failure_count(&self, instance_id: &str) -> u32 {
        self.breakers
            .get(instance_id)
            .map(|breaker| breaker.recent_failure_count())
            .unwrap_or(0)
    }

    /// Whether an instance currently has breaker state at all
    pub fn contains(&self, instance_id: &str) -> bool {
        self.breakers.contains_key(instance_id)
    }
}

impl Default for BreakerMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn test_breaker_starts_closed_and_empty() {
        let state = CircuitBreakerState::new("api-1");
        assert!(!state.is_open());
        assert_eq!(state.recent_failure_count(), 0);
        assert_eq!(state.instance_id(), "api-1");
    }

    #[test]
    fn test_trip_fires_exactly_once() {
        let mut state = CircuitBreakerState::new("api-1");
        assert!(state.trip());
        assert!(!state.trip());
        assert!(state.is_open());
    }

    #[test]
    fn test_reset_clears_history_and_closes() {
        let mut state = CircuitBreakerState::new("api-1");
        state.record_failure();
        state.record_failure();
        state.trip();

        state.reset();
        assert!(!state.is_open());
        assert_eq!(state.recent_failure_count(), 0);
    }

    #[test]
    fn test_prune_drops_stale_failures() {
        let mut state = CircuitBreakerState::new("api-1");
        state.record_failure();
        state.record_failure();

        // Zero-width window: everything recorded before now is stale
        std::thread::sleep(Duration::from_millis(5));
        state.remove_old_failures(Duration::ZERO);
        assert_eq!(state.recent_failure_count(), 0);
    }

    #[test]
    fn test_map_trips_at_threshold() {
        let map = BreakerMap::new();

        let first = map.record_failure("api-1", WINDOW, 3);
        assert_eq!(first.recent_failures, 1);
        assert!(!first.tripped);

        let second = map.record_failure("api-1", WINDOW, 3);
        assert_eq!(second.recent_failures, 2);
        assert!(!second.tripped);

        let third = map.record_failure("api-1", WINDOW, 3);
        assert_eq!(third.recent_failures, 3);
        assert!(third.tripped);

        // Already open: further failures never report a second trip
        let fourth = map.record_failure("api-1", WINDOW, 3);
        assert!(!fourth.tripped);
    }

    #[test]
    fn test_map_reset_discards_partial_failures() {
        let map = BreakerMap::new();
        map.record_failure("api-1", WINDOW, 3);
        map.record_failure("api-1", WINDOW, 3);

        map.reset("api-1");
        assert_eq!(map.failure_count("api-1"), 0);

        // No partial credit: the next excursion starts from scratch
        let verdict = map.record_failure("api-1", WINDOW, 3);
        assert_eq!(verdict.recent_failures, 1);
        assert!(!verdict.tripped);
    }

    #[test]
    fn test_map_remove_destroys_state() {
        let map = BreakerMap::new();
        map.record_failure("api-1", WINDOW, 3);
        assert!(map.contains("api-1"));

        map.remove("api-1");
        assert!(!map.contains("api-1"));
        assert_eq!(map.failure_count("api-1"), 0);
    }

    #[test]
    fn test_failures_outside_window_do_not_trip() {
        let map = BreakerMap::new();
        let tight = Duration::from_millis(10);

        map.record_failure("api-1", tight, 3);
        std::thread::sleep(Duration::from_millis(20));
        map.record_failure("api-1", tight, 3);
        std::thread::sleep(Duration::from_millis(20));
        let verdict = map.record_failure("api-1", tight, 3);

        assert_eq!(verdict.recent_failures, 1);
        assert!(!verdict.tripped);
    }
}
