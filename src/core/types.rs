//! # Core Types Module
//!
//! Data structures shared across the registry, health monitor, and API layer.
//! The wire format uses camelCase field names and upper-case enum values so
//! that instances written for the original registry protocol keep working
//! unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health status of a registered service instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
}

/// How an instance is expected to signal liveness
///
/// Stored and reported as registered, but the heartbeat-expiry sweep applies
/// uniformly to all instances regardless of mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HeartbeatMode {
    /// No heartbeat expected, polling only
    Disabled,
    /// Heartbeat can be sent but is not enforced
    Optional,
    /// Heartbeat must be sent or the instance will be removed
    Required,
}

impl Default for HeartbeatMode {
    fn default() -> Self {
        Self::Optional
    }
}

/// One registered replica of a service
///
/// Instances are owned exclusively by the [`InstanceRegistry`]; every accessor
/// hands out clones, never live references, so callers can hold a snapshot
/// without racing registry mutations.
///
/// [`InstanceRegistry`]: crate::registry::InstanceRegistry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstance {
    /// Name of the service (e.g. "user-service", "payment-service")
    pub service_name: String,

    /// Base URL of the instance (e.g. "http://localhost:8080")
    pub service_url: String,

    /// Unique identifier for this instance, unique across all services
    pub instance_id: String,

    /// Timestamp of the last heartbeat received from this instance
    pub last_heartbeat: DateTime<Utc>,

    /// Current health status
    pub status: ServiceStatus,

    /// Current load on the instance (percentage, 0-100)
    #[serde(default)]
    pub current_load: Option<f64>,

    /// Number of requests currently being processed
    #[serde(default)]
    pub request_count: Option<i64>,

    /// Liveness signalling mode
    #[serde(default)]
    pub heartbeat_mode: HeartbeatMode,
}

impl ServiceInstance {
    /// Load used for ordering: a missing load sorts as 0.0
    pub fn effective_load(&self) -> f64 {
        self.current_load.unwrap_or(0.0)
    }

    pub fn is_healthy(&self) -> bool {
        self.status == ServiceStatus::Healthy
    }
}

/// Body of `POST /api/discovery/register`
///
/// The three string fields are required and must be non-blank; the optional
/// fields default to load 0.0, request count 0, and heartbeat mode OPTIONAL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub service_url: Option<String>,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub current_load: Option<f64>,
    #[serde(default)]
    pub request_count: Option<i64>,
    #[serde(default)]
    pub heartbeat_mode: Option<HeartbeatMode>,
}

/// Body of `POST /api/discovery/heartbeat`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub current_load: Option<f64>,
    #[serde(default)]
    pub request_count: Option<i64>,
}

/// Uniform response envelope for the discovery API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn success_empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}
