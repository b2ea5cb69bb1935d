//! # Discovery API Integration Tests
//!
//! Exercises the HTTP surface end to end with an in-process test server:
//! registration and validation, lookup and load-sorted lookup, heartbeats,
//! deregistration, and the log retrieval endpoints.

use std::io::Write;
use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

use service_discovery::api::{self, AppState};
use service_discovery::core::types::ServiceStatus;
use service_discovery::logs::LogStore;
use service_discovery::InstanceRegistry;

fn test_server() -> (TestServer, Arc<InstanceRegistry>) {
    test_server_with_logs("/nonexistent/test.log").0
}

fn test_server_with_logs(
    log_path: impl Into<std::path::PathBuf>,
) -> ((TestServer, Arc<InstanceRegistry>), Arc<LogStore>) {
    let registry = Arc::new(InstanceRegistry::new());
    let logs = Arc::new(LogStore::new(log_path));
    let state = AppState {
        registry: Arc::clone(&registry),
        logs: Arc::clone(&logs),
    };
    let server = TestServer::new(api::router(state)).expect("failed to start test server");
    ((server, registry), logs)
}

fn register_body(service: &str, id: &str) -> Value {
    json!({
        "serviceName": service,
        "serviceUrl": format!("http://{}.local:9000", id),
        "instanceId": id,
    })
}

#[tokio::test]
async fn register_returns_created_with_envelope() {
    let (server, registry) = test_server();

    let response = server
        .post("/api/discovery/register")
        .json(&register_body("users", "u-1"))
        .await;

    response.assert_status(axum::http::StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(
        body["message"],
        json!("Service instance registered successfully")
    );
    assert_eq!(body["data"]["serviceName"], json!("users"));
    assert_eq!(body["data"]["instanceId"], json!("u-1"));
    // Registration defaults
    assert_eq!(body["data"]["status"], json!("HEALTHY"));
    assert_eq!(body["data"]["currentLoad"], json!(0.0));
    assert_eq!(body["data"]["requestCount"], json!(0));
    assert_eq!(body["data"]["heartbeatMode"], json!("OPTIONAL"));

    assert_eq!(registry.instance_count(), 1);
}

#[tokio::test]
async fn register_rejects_blank_required_fields() {
    let (server, registry) = test_server();

    let response = server
        .post("/api/discovery/register")
        .json(&json!({
            "serviceName": "   ",
            "serviceUrl": "http://x:1",
            "instanceId": "u-1",
        }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert_eq!(
        body["message"],
        json!("Validation failed: serviceName - Service name is required")
    );
    assert_eq!(registry.instance_count(), 0);
}

#[tokio::test]
async fn register_rejects_missing_instance_id() {
    let (server, _registry) = test_server();

    let response = server
        .post("/api/discovery/register")
        .json(&json!({
            "serviceName": "users",
            "serviceUrl": "http://x:1",
        }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body["message"],
        json!("Validation failed: instanceId - Instance ID is required")
    );
}

#[tokio::test]
async fn duplicate_instance_id_replaces_registration() {
    let (server, registry) = test_server();

    server
        .post("/api/discovery/register")
        .json(&register_body("users", "u-1"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);
    let response = server
        .post("/api/discovery/register")
        .json(&json!({
            "serviceName": "users",
            "serviceUrl": "http://replacement:9001",
            "instanceId": "u-1",
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    assert_eq!(registry.instance_count(), 1);
    let stored = registry.get_instance("u-1").unwrap();
    assert_eq!(stored.service_url, "http://replacement:9001");
}

#[tokio::test]
async fn get_instances_for_unknown_service_returns_404() {
    let (server, _registry) = test_server();

    let response = server.get("/api/discovery/services/ghost").await;

    response.assert_status(axum::http::StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert_eq!(
        body["message"],
        json!("No instances found for service: ghost")
    );
}

#[tokio::test]
async fn get_instances_lists_all_registered() {
    let (server, _registry) = test_server();

    for id in ["u-1", "u-2"] {
        server
            .post("/api/discovery/register")
            .json(&register_body("users", id))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    let response = server.get("/api/discovery/services/users").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], json!("Found 2 instance(s) for service: users"));
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn by_load_sorts_ascending_and_skips_unhealthy() {
    let (server, registry) = test_server();

    for (id, load) in [("u-1", 70.0), ("u-2", 10.0), ("u-3", 40.0)] {
        server
            .post("/api/discovery/register")
            .json(&json!({
                "serviceName": "users",
                "serviceUrl": format!("http://{}:9000", id),
                "instanceId": id,
                "currentLoad": load,
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }
    registry.update_status("u-3", ServiceStatus::Unhealthy);

    let response = server.get("/api/discovery/services/users/by-load").await;
    response.assert_status_ok();
    let body: Value = response.json();
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|instance| instance["instanceId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["u-2", "u-1"]);
}

#[tokio::test]
async fn by_load_with_only_unhealthy_instances_returns_404() {
    let (server, registry) = test_server();

    server
        .post("/api/discovery/register")
        .json(&register_body("users", "u-1"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);
    registry.update_status("u-1", ServiceStatus::Unhealthy);

    let response = server.get("/api/discovery/services/users/by-load").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(
        body["message"],
        json!("No healthy instances found for service: users")
    );
}

#[tokio::test]
async fn heartbeat_updates_known_instance() {
    let (server, registry) = test_server();

    server
        .post("/api/discovery/register")
        .json(&register_body("users", "u-1"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server
        .post("/api/discovery/heartbeat")
        .json(&json!({
            "instanceId": "u-1",
            "currentLoad": 55.5,
            "requestCount": 120,
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("Heartbeat updated successfully"));

    let stored = registry.get_instance("u-1").unwrap();
    assert_eq!(stored.current_load, Some(55.5));
    assert_eq!(stored.request_count, Some(120));
}

#[tokio::test]
async fn heartbeat_for_unknown_instance_returns_404() {
    let (server, _registry) = test_server();

    let response = server
        .post("/api/discovery/heartbeat")
        .json(&json!({"instanceId": "ghost"}))
        .await;

    response.assert_status(axum::http::StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn heartbeat_without_instance_id_returns_400() {
    let (server, _registry) = test_server();

    let response = server
        .post("/api/discovery/heartbeat")
        .json(&json!({"currentLoad": 10.0}))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deregister_removes_instance() {
    let (server, registry) = test_server();

    server
        .post("/api/discovery/register")
        .json(&register_body("users", "u-1"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server.delete("/api/discovery/deregister/u-1").await;
    response.assert_status_ok();
    assert_eq!(registry.instance_count(), 0);

    // Second attempt: already gone
    let response = server.delete("/api/discovery/deregister/u-1").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_all_services_groups_by_name() {
    let (server, _registry) = test_server();

    for (service, id) in [("users", "u-1"), ("users", "u-2"), ("orders", "o-1")] {
        server
            .post("/api/discovery/register")
            .json(&register_body(service, id))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    let response = server.get("/api/discovery/services").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body["message"],
        json!("Found 2 service(s) with 3 total instance(s)")
    );
    assert_eq!(body["data"]["users"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["orders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn health_endpoint_reports_registry_counts() {
    let (server, _registry) = test_server();

    server
        .post("/api/discovery/register")
        .json(&register_body("users", "u-1"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server.get("/api/discovery/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["status"], json!("UP"));
    assert_eq!(body["data"]["registeredServices"], json!(1));
    assert_eq!(body["data"]["totalInstances"], json!(1));
}

#[tokio::test]
async fn status_endpoint_is_probe_compatible() {
    let (server, _registry) = test_server();

    let response = server.get("/status").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], json!("UP"));
    assert!(body["load"].is_number());
    assert!(body["requestCount"].is_number());
}

#[tokio::test]
async fn recent_logs_returns_last_lines() {
    let mut file = NamedTempFile::new().unwrap();
    for i in 1..=5 {
        writeln!(file, "line {}", i).unwrap();
    }
    let ((server, _registry), _logs) = test_server_with_logs(file.path());

    let response = server.get("/api/discovery/logs/recent?lines=2").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"], json!(["line 4", "line 5"]));
    assert_eq!(body["message"], json!("Retrieved 2 log lines"));
}

#[tokio::test]
async fn recent_logs_rejects_out_of_range_lines() {
    let (server, _registry) = test_server();

    for query in ["lines=0", "lines=10001"] {
        let response = server
            .get(&format!("/api/discovery/logs/recent?{}", query))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(
            body["message"],
            json!("Validation failed: lines - Lines parameter must be between 1 and 10000")
        );
    }
}

#[tokio::test]
async fn recent_logs_with_missing_file_returns_empty_list() {
    let (server, _registry) = test_server();

    let response = server.get("/api/discovery/logs/recent").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn download_logs_sets_attachment_headers() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "startup complete").unwrap();
    let ((server, _registry), _logs) = test_server_with_logs(file.path());

    let response = server.get("/api/discovery/logs").await;
    response.assert_status_ok();
    let disposition = response
        .headers()
        .get(axum::http::header::CONTENT_DISPOSITION)
        .expect("content-disposition header")
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"service-discovery-logs_"));
    assert!(response.text().contains("startup complete"));
}

#[tokio::test]
async fn download_logs_with_missing_file_fails() {
    let (server, _registry) = test_server();

    let response = server.get("/api/discovery/logs").await;
    response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
}
