//! # Health Monitor
//!
//! Periodic health checking of every registered service instance. Each pass
//! snapshots the registry, probes every instance's `/status` endpoint
//! concurrently, and feeds the outcomes into per-instance circuit breakers.
//! Instances whose breaker trips, and instances whose heartbeat has expired,
//! are deregistered and their monitor-side state discarded.
//!
//! Probes are independent spawned tasks bounded by the configured timeout: a
//! slow or hanging instance never delays checks of other instances, and one
//! probe's failure never aborts the pass. Probe failures are fully contained
//! here; they drive the breaker and are never surfaced as API errors.

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::config::HealthCheckConfig;
use crate::core::types::{ServiceInstance, ServiceStatus};
use crate::health::circuit_breaker::BreakerMap;
use crate::notify::AlertSink;
use crate::registry::InstanceRegistry;

/// Periodic health checker with circuit breaking and heartbeat expiry
///
/// Owns the circuit breaker map and the per-instance "high-load alert sent"
/// flags, both keyed by instance id. Both are cleaned up whenever the
/// corresponding instance leaves the registry through any path: breaker trip,
/// heartbeat expiry, or explicit deregistration.
pub struct HealthMonitor {
    registry: Arc<InstanceRegistry>,
    alerts: Arc<dyn AlertSink>,
    client: reqwest::Client,
    breakers: BreakerMap,
    high_load_alerted: DashMap<String, ()>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<InstanceRegistry>,
        alerts: Arc<dyn AlertSink>,
        config: HealthCheckConfig,
    ) -> Self {
        Self {
            registry,
            alerts,
            client: reqwest::Client::new(),
            breakers: BreakerMap::new(),
            high_load_alerted: DashMap::new(),
            config,
        }
    }

    /// Start the background check loop at the configured interval
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            interval = ?self.config.interval,
            timeout = ?self.config.timeout,
            "Starting health monitor"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                self.run_pass().await;
            }
        })
    }

    /// Run one full health-check pass
    ///
    /// Probes fan out as independent tasks; the heartbeat sweep runs
    /// unconditionally and does not wait for probe outcomes from this pass.
    /// The pass itself completes once every probe callback has run, which
    /// takes at most roughly the probe timeout.
    pub async fn run_pass(self: &Arc<Self>) {
        info!("Starting scheduled health check");

        let instances = self.registry.get_all_instances();
        info!(count = instances.len(), "Checking health of service instances");

        let mut probes = Vec::with_capacity(instances.len());
        for instance in instances {
            let monitor = Arc::clone(self);
            probes.push(tokio::spawn(async move {
                monitor.check_instance(instance).await;
            }));
        }

        self.sweep_expired_heartbeats().await;

        for probe in probes {
            // A panicked probe task is isolated to its instance.
            let _ = probe.await;
        }

        info!("Completed scheduled health check");
    }

    /// Probe one instance and handle the outcome
    async fn check_instance(&self, instance: ServiceInstance) {
        let status_url = format!("{}/status", instance.service_url);
        debug!(
            instance_id = %instance.instance_id,
            url = %status_url,
            "Checking instance health"
        );

        match self.probe(&status_url).await {
            Ok(body) => self.handle_probe_success(instance, body).await,
            Err(e) => self.handle_probe_failure(instance, e).await,
        }
    }

    /// Issue the status probe
    ///
    /// Any response received within the timeout is a success; an unparseable
    /// body degrades to an empty one rather than failing the probe.
    async fn probe(&self, status_url: &str) -> Result<Value, reqwest::Error> {
        let response = self
            .client
            .get(status_url)
            .timeout(self.config.timeout)
            .send()
            .await?;

        Ok(response.json::<Value>().await.unwrap_or(Value::Null))
    }

    async fn handle_probe_success(&self, instance: ServiceInstance, body: Value) {
        debug!(instance_id = %instance.instance_id, "Health check successful");

        // `load` and `requestCount` are optional, independently typed fields;
        // absent or invalid values leave the stored metrics intact.
        let load = body.get("load").and_then(Value::as_f64);
        let request_count = body.get("requestCount").and_then(Value::as_i64);

        if load.is_some() || request_count.is_some() {
            self.registry
                .update_metrics(&instance.instance_id, load, request_count);
        }

        if let Some(load) = load {
            if load > self.config.load_threshold {
                self.send_high_load_alert_once(&instance, load, request_count)
                    .await;
            } else {
                // Load back to normal: arm the alert for the next excursion
                self.high_load_alerted.remove(&instance.instance_id);
            }
        }

        let current_status = self
            .registry
            .get_instance(&instance.instance_id)
            .map(|current| current.status);
        if current_status == Some(ServiceStatus::Unhealthy) {
            self.registry
                .update_status(&instance.instance_id, ServiceStatus::Healthy);
            info!(
                instance_id = %instance.instance_id,
                service_name = %instance.service_name,
                "Service instance recovered"
            );
        }

        self.breakers.reset(&instance.instance_id);
    }

    async fn handle_probe_failure(&self, instance: ServiceInstance, error: reqwest::Error) {
        warn!(
            instance_id = %instance.instance_id,
            error = %error,
            "Health check failed"
        );

        let verdict = self.breakers.record_failure(
            &instance.instance_id,
            self.config.failure_window(),
            self.config.failure_threshold,
        );

        info!(
            instance_id = %instance.instance_id,
            failures = verdict.recent_failures,
            "Circuit breaker failure count in window"
        );

        if verdict.recent_failures >= self.config.failure_threshold {
            if verdict.tripped {
                self.handle_circuit_breaker_trip(&instance, verdict.recent_failures)
                    .await;
            }
        } else {
            // Below threshold: mark unhealthy, but only alert on the
            // Healthy -> Unhealthy transition, not on every failed probe.
            let current_status = self
                .registry
                .get_instance(&instance.instance_id)
                .map(|current| current.status);
            if current_status == Some(ServiceStatus::Healthy) {
                self.registry
                    .update_status(&instance.instance_id, ServiceStatus::Unhealthy);
                self.alerts.notify_unhealthy(&instance).await;
                warn!(
                    instance_id = %instance.instance_id,
                    service_name = %instance.service_name,
                    "Service instance marked as unhealthy"
                );
            }
        }
    }

    /// Remove a tripped instance from the registry
    ///
    /// Reached at most once per breaker: the Closed -> Open transition is
    /// guarded inside the breaker map.
    async fn handle_circuit_breaker_trip(&self, instance: &ServiceInstance, failure_count: u32) {
        error!(
            instance_id = %instance.instance_id,
            service_name = %instance.service_name,
            failures = failure_count,
            "Circuit breaker TRIPPED"
        );

        self.alerts
            .notify_circuit_breaker_tripped(
                &instance.instance_id,
                &instance.service_name,
                failure_count,
            )
            .await;

        info!(
            instance_id = %instance.instance_id,
            service_name = %instance.service_name,
            "Removing unhealthy service instance"
        );

        self.alerts.notify_removed(instance, failure_count).await;
        self.registry.deregister(&instance.instance_id);

        self.breakers.remove(&instance.instance_id);
        self.high_load_alerted.remove(&instance.instance_id);
    }

    /// Deregister every instance whose heartbeat is older than the timeout
    ///
    /// Applies to all instances regardless of status or heartbeat mode, and
    /// independently of probe outcomes in the same pass.
    async fn sweep_expired_heartbeats(&self) {
        let cutoff = Utc::now()
            - chrono::Duration::milliseconds(self.config.heartbeat_timeout.as_millis() as i64);

        for instance in self.registry.get_all_instances() {
            if instance.last_heartbeat < cutoff {
                warn!(
                    instance_id = %instance.instance_id,
                    service_name = %instance.service_name,
                    last_heartbeat = %instance.last_heartbeat,
                    "Service instance heartbeat expired"
                );

                self.registry.deregister(&instance.instance_id);
                self.breakers.remove(&instance.instance_id);
                self.high_load_alerted.remove(&instance.instance_id);

                info!(
                    instance_id = %instance.instance_id,
                    "Removed service instance due to expired heartbeat"
                );
            }
        }
    }

    /// Fire the high-load alert once per excursion above the threshold
    async fn send_high_load_alert_once(
        &self,
        instance: &ServiceInstance,
        load: f64,
        request_count: Option<i64>,
    ) {
        let newly_flagged = self
            .high_load_alerted
            .insert(instance.instance_id.clone(), ())
            .is_none();
        if !newly_flagged {
            return;
        }

        let mut alerted = instance.clone();
        alerted.current_load = Some(load);
        if request_count.is_some() {
            alerted.request_count = request_count;
        }

        self.alerts
            .notify_high_load(&alerted, self.config.load_threshold)
            .await;
        warn!(
            instance_id = %instance.instance_id,
            service_name = %instance.service_name,
            load,
            "High load detected"
        );
    }

    /// Current windowed failure count for an instance (monitoring/debugging)
    pub fn breaker_failure_count(&self, instance_id: &str) -> u32 {
        self.breakers.failure_count(instance_id)
    }

    /// Whether monitor-side state exists for an instance
    pub fn has_breaker_state(&self, instance_id: &str) -> bool {
        self.breakers.contains(instance_id)
    }
}
