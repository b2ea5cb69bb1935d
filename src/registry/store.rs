//! # Instance Registry
//!
//! Thread-safe in-memory registry of service instances with concurrent access
//! using `DashMap`. The map is keyed by service name and holds the list of
//! instances for that service, so operations on different services never
//! contend on a shared lock.
//!
//! Every read returns a point-in-time snapshot (cloned data), never a live
//! reference a caller could mutate concurrently with registry operations. A
//! snapshot may be stale relative to an in-flight health probe completing a
//! moment later; that staleness is accepted.

use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::core::types::{ServiceInstance, ServiceStatus};

/// In-memory service registry
///
/// Owns every [`ServiceInstance`] record. Instance ids are unique across all
/// service names: re-registering an existing id under the same service
/// replaces the record in place, and [`deregister`](Self::deregister) searches
/// every service for the id.
pub struct InstanceRegistry {
    /// Service name -> instances of that service
    services: DashMap<String, Vec<ServiceInstance>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register a service instance, replacing any existing instance with the
    /// same id under that service.
    ///
    /// Sets `status = Healthy` and `last_heartbeat = now` unconditionally, so
    /// a re-registration always starts from a clean slate. Returns the stored
    /// instance.
    pub fn register(&self, mut instance: ServiceInstance) -> ServiceInstance {
        info!(
            service_name = %instance.service_name,
            instance_id = %instance.instance_id,
            service_url = %instance.service_url,
            "Registering service instance"
        );

        instance.last_heartbeat = Utc::now();
        instance.status = ServiceStatus::Healthy;

        let stored = instance.clone();
        let mut instances = self
            .services
            .entry(instance.service_name.clone())
            .or_default();
        instances.retain(|existing| existing.instance_id != instance.instance_id);
        instances.push(instance);

        info!(
            service_name = %stored.service_name,
            instance_id = %stored.instance_id,
            total_instances = instances.len(),
            "Service instance registered"
        );

        stored
    }

    /// Get a snapshot of all instances of a service (empty if unknown)
    pub fn get_instances(&self, service_name: &str) -> Vec<ServiceInstance> {
        self.services
            .get(service_name)
            .map(|instances| instances.clone())
            .unwrap_or_default()
    }

    /// Get the healthy instances of a service, sorted ascending by load
    ///
    /// Unhealthy instances are excluded even when their load is lowest. The
    /// sort is stable, so instances with equal load keep registration order.
    /// A missing load sorts as 0.0.
    pub fn get_instances_by_load(&self, service_name: &str) -> Vec<ServiceInstance> {
        let mut instances: Vec<ServiceInstance> = self
            .get_instances(service_name)
            .into_iter()
            .filter(|instance| instance.is_healthy())
            .collect();

        instances.sort_by(|a, b| a.effective_load().total_cmp(&b.effective_load()));
        instances
    }

    /// Remove an instance by id, searching every service
    ///
    /// When the removal empties a service's instance list the service entry
    /// itself is removed. Returns whether anything was removed.
    pub fn deregister(&self, instance_id: &str) -> bool {
        info!(instance_id, "Deregistering service instance");

        // Locate the owning service first; mutating the map while iterating
        // it would hold a shard lock across the removal.
        let service_name = self.services.iter().find_map(|entry| {
            entry
                .iter()
                .any(|instance| instance.instance_id == instance_id)
                .then(|| entry.key().clone())
        });

        let Some(service_name) = service_name else {
            warn!(instance_id, "Service instance not found for deregistration");
            return false;
        };

        let mut removed = false;
        let mut emptied = false;
        if let Some(mut instances) = self.services.get_mut(&service_name) {
            let before = instances.len();
            instances.retain(|instance| instance.instance_id != instance_id);
            removed = instances.len() < before;
            emptied = removed && instances.is_empty();

            if removed {
                info!(
                    instance_id,
                    service_name = %service_name,
                    remaining_instances = instances.len(),
                    "Service instance deregistered"
                );
            }
        }

        if emptied {
            // Re-check emptiness under the entry lock: a concurrent register
            // may have added an instance since the guard was dropped.
            self.services
                .remove_if(&service_name, |_, instances| instances.is_empty());
            info!(%service_name, "Service has no more instances, removed from registry");
        }

        if !removed {
            warn!(instance_id, "Service instance not found for deregistration");
        }
        removed
    }

    /// Refresh an instance's heartbeat, optionally updating load and request
    /// count. Only the fields provided are written. Returns whether the
    /// instance was found.
    pub fn update_heartbeat(
        &self,
        instance_id: &str,
        current_load: Option<f64>,
        request_count: Option<i64>,
    ) -> bool {
        for mut entry in self.services.iter_mut() {
            if let Some(instance) = entry
                .iter_mut()
                .find(|instance| instance.instance_id == instance_id)
            {
                instance.last_heartbeat = Utc::now();
                if let Some(load) = current_load {
                    instance.current_load = Some(load);
                }
                if let Some(count) = request_count {
                    instance.request_count = Some(count);
                }
                debug!(instance_id, ?current_load, ?request_count, "Heartbeat updated");
                return true;
            }
        }

        warn!(instance_id, "Service instance not found for heartbeat update");
        false
    }

    /// Write back probe metrics without touching the heartbeat timestamp
    ///
    /// Health probes are pull-based and must not count as liveness; only the
    /// push-based heartbeat refreshes `last_heartbeat`.
    pub fn update_metrics(
        &self,
        instance_id: &str,
        current_load: Option<f64>,
        request_count: Option<i64>,
    ) -> bool {
        for mut entry in self.services.iter_mut() {
            if let Some(instance) = entry
                .iter_mut()
                .find(|instance| instance.instance_id == instance_id)
            {
                if let Some(load) = current_load {
                    instance.current_load = Some(load);
                }
                if let Some(count) = request_count {
                    instance.request_count = Some(count);
                }
                return true;
            }
        }
        false
    }

    /// Overwrite an instance's health status. Returns whether it was found.
    pub fn update_status(&self, instance_id: &str, status: ServiceStatus) -> bool {
        for mut entry in self.services.iter_mut() {
            if let Some(instance) = entry
                .iter_mut()
                .find(|instance| instance.instance_id == instance_id)
            {
                let old_status = instance.status;
                instance.status = status;
                info!(
                    instance_id,
                    ?old_status,
                    new_status = ?status,
                    "Service instance status updated"
                );
                return true;
            }
        }
        false
    }

    /// Snapshot of a single instance by id
    pub fn get_instance(&self, instance_id: &str) -> Option<ServiceInstance> {
        for entry in self.services.iter() {
            if let Some(instance) = entry
                .iter()
                .find(|instance| instance.instance_id == instance_id)
            {
                return Some(instance.clone());
            }
        }
        None
    }

    /// Snapshot of every service with its instances
    pub fn get_all_services(&self) -> HashMap<String, Vec<ServiceInstance>> {
        self.services
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Flattened snapshot of every registered instance
    pub fn get_all_instances(&self) -> Vec<ServiceInstance> {
        self.services
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of distinct services
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Total number of registered instances
    pub fn instance_count(&self) -> usize {
        self.services.iter().map(|entry| entry.len()).sum()
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
