//! Health monitoring: periodic status probes, per-instance circuit breakers,
//! and heartbeat-expiry eviction.

pub mod circuit_breaker;
pub mod monitor;

pub use circuit_breaker::{BreakerMap, CircuitBreakerState, FailureVerdict};
pub use monitor::HealthMonitor;
