//! # Service Discovery - Main Entry Point
//!
//! Starts the discovery registry: initializes logging, loads configuration,
//! wires the registry, health monitor, and alert sink together, and serves
//! the HTTP API until a shutdown signal arrives.

use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use service_discovery::api::{self, AppState};
use service_discovery::core::config::LoggingConfig;
use service_discovery::logs::LogStore;
use service_discovery::notify::webhook::WebhookAlertSink;
use service_discovery::notify::{AlertSink, NoopAlertSink};
use service_discovery::{DiscoveryConfig, DiscoveryError, DiscoveryResult, HealthMonitor, InstanceRegistry};

#[tokio::main]
async fn main() -> DiscoveryResult<()> {
    // Config first: the logging setup needs the file path and level. Errors
    // before the subscriber exists still reach stderr through the Display
    // impl on the way out of main.
    let config = DiscoveryConfig::load().await?;
    init_logging(&config.logging)?;

    info!("Starting Service Discovery");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        interval = ?config.health_check.interval,
        heartbeat_timeout = ?config.health_check.heartbeat_timeout,
        failure_threshold = config.health_check.failure_threshold,
        "Health monitoring configured"
    );

    let registry = Arc::new(InstanceRegistry::new());

    let alerts: Arc<dyn AlertSink> = if config.notifications.enabled {
        Arc::new(WebhookAlertSink::new(config.notifications.clone()))
    } else {
        info!("Notifications disabled");
        Arc::new(NoopAlertSink)
    };

    let monitor = Arc::new(HealthMonitor::new(
        Arc::clone(&registry),
        alerts,
        config.health_check.clone(),
    ));
    let monitor_handle = monitor.start();

    let state = AppState {
        registry,
        logs: Arc::new(LogStore::new(config.logging.file.clone())),
    };
    let app = api::router(state);

    let bind_addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| DiscoveryError::config(format!("Failed to bind {}: {}", bind_addr, e)))?;

    info!("Service Discovery ready on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {}", e);
            DiscoveryError::internal(format!("Server error: {}", e))
        })?;

    // The monitor loop has no work left once the server stops accepting
    // registrations; in-flight probes stay bounded by their own timeout.
    monitor_handle.abort();

    info!("Service Discovery shutdown complete");
    Ok(())
}

/// Initialize tracing with an optional file writer for log retrieval
fn init_logging(config: &LoggingConfig) -> DiscoveryResult<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let file_layer = if config.file.is_empty() {
        None
    } else {
        if let Some(parent) = Path::new(&config.file).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file)?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true).json())
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }

    Ok(())
}

/// Resolve when SIGTERM or SIGINT arrives
async fn shutdown_signal() {
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    let interrupt = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install SIGINT handler");
    };

    tokio::select! {
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
        _ = interrupt => info!("Received SIGINT, initiating graceful shutdown"),
    }
}
