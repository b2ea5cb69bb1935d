//! HTTP API surface for the discovery registry.
//!
//! Thin axum layer over [`InstanceRegistry`] and [`LogStore`]: request
//! validation happens here, before anything reaches the registry, and
//! registry outcomes map onto the shared [`ApiResponse`] envelope.
//!
//! [`InstanceRegistry`]: crate::registry::InstanceRegistry
//! [`LogStore`]: crate::logs::LogStore
//! [`ApiResponse`]: crate::core::types::ApiResponse

pub mod handlers;

use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::logs::LogStore;
use crate::registry::InstanceRegistry;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<InstanceRegistry>,
    pub logs: Arc<LogStore>,
}

/// Build the discovery API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/discovery/register", post(handlers::register_service))
        .route("/api/discovery/services", get(handlers::get_all_services))
        .route(
            "/api/discovery/services/:service_name",
            get(handlers::get_service_instances),
        )
        .route(
            "/api/discovery/services/:service_name/by-load",
            get(handlers::get_service_instances_by_load),
        )
        .route("/api/discovery/heartbeat", post(handlers::update_heartbeat))
        .route(
            "/api/discovery/deregister/:instance_id",
            delete(handlers::deregister_service),
        )
        .route("/api/discovery/health", get(handlers::health_check))
        .route("/api/discovery/logs", get(handlers::download_logs))
        .route("/api/discovery/logs/recent", get(handlers::get_recent_logs))
        .route("/status", get(handlers::status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
