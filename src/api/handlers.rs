//! Request handlers for the discovery API.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::core::error::{DiscoveryError, DiscoveryResult};
use crate::core::types::{
    ApiResponse, HeartbeatRequest, RegisterRequest, ServiceInstance, ServiceStatus,
};

use super::AppState;

/// Extract a required, non-blank string field from a request body
fn require_field(value: &Option<String>, field: &str, message: &str) -> DiscoveryResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(DiscoveryError::validation(field, message)),
    }
}

/// `POST /api/discovery/register`
pub async fn register_service(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> DiscoveryResult<Response> {
    let service_name = require_field(
        &request.service_name,
        "serviceName",
        "Service name is required",
    )?;
    let service_url = require_field(
        &request.service_url,
        "serviceUrl",
        "Service URL is required",
    )?;
    let instance_id = require_field(
        &request.instance_id,
        "instanceId",
        "Instance ID is required",
    )?;

    info!(
        service_name = %service_name,
        instance_id = %instance_id,
        "Received registration request"
    );

    let instance = ServiceInstance {
        service_name,
        service_url,
        instance_id,
        last_heartbeat: Utc::now(),
        status: ServiceStatus::Healthy,
        current_load: Some(request.current_load.unwrap_or(0.0)),
        request_count: Some(request.request_count.unwrap_or(0)),
        heartbeat_mode: request.heartbeat_mode.unwrap_or_default(),
    };

    let registered = state.registry.register(instance);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            registered,
            "Service instance registered successfully",
        )),
    )
        .into_response())
}

/// `GET /api/discovery/services/{serviceName}`
pub async fn get_service_instances(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> Response {
    debug!(service_name = %service_name, "Retrieving service instances");

    let instances = state.registry.get_instances(&service_name);
    if instances.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<Vec<ServiceInstance>>::error(format!(
                "No instances found for service: {}",
                service_name
            ))),
        )
            .into_response();
    }

    let message = format!(
        "Found {} instance(s) for service: {}",
        instances.len(),
        service_name
    );
    Json(ApiResponse::success(instances, message)).into_response()
}

/// `GET /api/discovery/services/{serviceName}/by-load`
pub async fn get_service_instances_by_load(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> Response {
    debug!(service_name = %service_name, "Retrieving service instances sorted by load");

    let instances = state.registry.get_instances_by_load(&service_name);
    if instances.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<Vec<ServiceInstance>>::error(format!(
                "No healthy instances found for service: {}",
                service_name
            ))),
        )
            .into_response();
    }

    let message = format!(
        "Found {} healthy instance(s) for service: {} (sorted by load)",
        instances.len(),
        service_name
    );
    Json(ApiResponse::success(instances, message)).into_response()
}

/// `POST /api/discovery/heartbeat`
pub async fn update_heartbeat(
    State(state): State<AppState>,
    Json(request): Json<HeartbeatRequest>,
) -> DiscoveryResult<Response> {
    let instance_id = require_field(
        &request.instance_id,
        "instanceId",
        "Instance ID is required",
    )?;

    debug!(instance_id = %instance_id, "Received heartbeat");

    let updated = state.registry.update_heartbeat(
        &instance_id,
        request.current_load,
        request.request_count,
    );

    if updated {
        Ok(Json(ApiResponse::<()>::success_empty("Heartbeat updated successfully")).into_response())
    } else {
        Err(DiscoveryError::not_found(instance_id))
    }
}

/// `DELETE /api/discovery/deregister/{instanceId}`
pub async fn deregister_service(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> DiscoveryResult<Response> {
    info!(instance_id = %instance_id, "Received deregistration request");

    if state.registry.deregister(&instance_id) {
        Ok(
            Json(ApiResponse::<()>::success_empty(
                "Service instance deregistered successfully",
            ))
            .into_response(),
        )
    } else {
        Err(DiscoveryError::not_found(instance_id))
    }
}

/// `GET /api/discovery/services`
pub async fn get_all_services(State(state): State<AppState>) -> Response {
    debug!("Retrieving all services");

    let all_services = state.registry.get_all_services();
    let total_instances: usize = all_services.values().map(|instances| instances.len()).sum();
    let message = format!(
        "Found {} service(s) with {} total instance(s)",
        all_services.len(),
        total_instances
    );

    Json(ApiResponse::success(all_services, message)).into_response()
}

/// `GET /api/discovery/health` — registry self-report
pub async fn health_check(State(state): State<AppState>) -> Response {
    let health = json!({
        "status": "UP",
        "timestamp": Utc::now(),
        "service": "service-discovery",
        "registeredServices": state.registry.service_count(),
        "totalInstances": state.registry.instance_count(),
    });

    Json(ApiResponse::success(health, "Service Discovery is healthy")).into_response()
}

/// `GET /status` — the registry's own probe endpoint
pub async fn status() -> Response {
    Json(json!({
        "status": "UP",
        "load": 0.0,
        "requestCount": 0,
        "timestamp": Utc::now(),
    }))
    .into_response()
}

/// `GET /api/discovery/logs` — download the log file
pub async fn download_logs(State(state): State<AppState>) -> DiscoveryResult<Response> {
    info!("Received request to download logs");

    let content = state.logs.read_all().await?;
    let filename = state.logs.download_filename();

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        content,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct RecentLogsParams {
    pub lines: Option<usize>,
}

/// `GET /api/discovery/logs/recent?lines=N`
pub async fn get_recent_logs(
    State(state): State<AppState>,
    Query(params): Query<RecentLogsParams>,
) -> DiscoveryResult<Response> {
    let lines = params.lines.unwrap_or(100);
    if lines == 0 || lines > 10_000 {
        return Err(DiscoveryError::validation(
            "lines",
            "Lines parameter must be between 1 and 10000",
        ));
    }

    debug!(lines, "Retrieving recent log lines");

    let logs = state.logs.recent(lines).await;
    let message = format!("Retrieved {} log lines", logs.len());
    Ok(Json(ApiResponse::success(logs, message)).into_response())
}
