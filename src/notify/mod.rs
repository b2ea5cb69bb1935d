//! Alert delivery for health-state transitions.
//!
//! The health monitor talks to an [`AlertSink`] trait object and never to a
//! concrete channel, so alert delivery is an injected dependency. Every sink
//! implementation is best-effort: delivery failures are logged and discarded
//! and must never stall or fail a health-check pass.

pub mod webhook;

use async_trait::async_trait;

use crate::core::types::ServiceInstance;

/// Receiver of health-state transition alerts
///
/// All methods return quickly from the monitor's point of view; slow
/// transports have to decouple internally (see
/// [`WebhookAlertSink`](webhook::WebhookAlertSink)).
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// An instance transitioned Healthy -> Unhealthy
    async fn notify_unhealthy(&self, instance: &ServiceInstance);

    /// An instance was removed from the registry by its circuit breaker
    async fn notify_removed(&self, instance: &ServiceInstance, failure_count: u32);

    /// An instance's load crossed above the configured threshold
    async fn notify_high_load(&self, instance: &ServiceInstance, load_threshold: f64);

    /// An instance's circuit breaker tripped
    async fn notify_circuit_breaker_tripped(
        &self,
        instance_id: &str,
        service_name: &str,
        failure_count: u32,
    );
}

/// Sink that drops every alert; used when notifications are disabled
pub struct NoopAlertSink;

#[async_trait]
impl AlertSink for NoopAlertSink {
    async fn notify_unhealthy(&self, _instance: &ServiceInstance) {}

    async fn notify_removed(&self, _instance: &ServiceInstance, _failure_count: u32) {}

    async fn notify_high_load(&self, _instance: &ServiceInstance, _load_threshold: f64) {}

    async fn notify_circuit_breaker_tripped(
        &self,
        _instance_id: &str,
        _service_name: &str,
        _failure_count: u32,
    ) {
    }
}
