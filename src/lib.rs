//! # Service Discovery Library
//!
//! An in-memory service registry with active health monitoring and
//! per-instance circuit breaking. Instances register over HTTP, push
//! heartbeats to stay alive, and get probed on a fixed schedule; instances
//! that fail repeatedly or go silent are evicted and alerts are delivered
//! through a pluggable notification sink.
//!
//! The crate is organized around explicit, injectable components: an
//! [`InstanceRegistry`] owning all instance records, a [`HealthMonitor`]
//! owning the circuit breaker state, and an [`AlertSink`] consumed by the
//! monitor. There is no process-wide singleton state; `main` wires the
//! pieces together and passes them to their collaborators.

/// Core functionality: error types, configuration, and shared data structures
pub mod core;

/// The in-memory service registry with concurrency-safe CRUD and queries
pub mod registry;

/// Health monitoring: periodic probes, circuit breakers, heartbeat expiry
pub mod health;

/// Alert delivery for health-state transitions
pub mod notify;

/// HTTP API surface exposing registry operations
pub mod api;

/// Retrieval of the registry's own log file
pub mod logs;

pub use core::config::DiscoveryConfig;
pub use core::error::{DiscoveryError, DiscoveryResult};
pub use core::types::{HeartbeatMode, ServiceInstance, ServiceStatus};
pub use health::HealthMonitor;
pub use notify::AlertSink;
pub use registry::InstanceRegistry;
