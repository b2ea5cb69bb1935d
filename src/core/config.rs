//! # Configuration Module
//!
//! Configuration management for the discovery registry. Provides YAML parsing
//! with serde, environment variable overrides, and validation with detailed
//! error messages. All tunables consumed by the health monitor (interval,
//! timeouts, thresholds) live here; nothing is hard-wired into the algorithm.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::error::{DiscoveryError, DiscoveryResult};

/// Top-level configuration for the discovery registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Health monitor and circuit breaker tunables
    pub health_check: HealthCheckConfig,

    /// Webhook alert delivery settings
    pub notifications: NotificationConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            health_check: HealthCheckConfig::default(),
            notifications: NotificationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8500,
        }
    }
}

/// Health monitor configuration
///
/// The failure window for the circuit breaker is derived as
/// `timeout * window_multiplier`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// How often a full health-check pass runs
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Per-probe timeout; no response within this window is a failure
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Instances whose last heartbeat is older than this are swept out
    #[serde(with = "humantime_serde")]
    pub heartbeat_timeout: Duration,

    /// Recent failures needed to trip an instance's circuit breaker
    pub failure_threshold: u32,

    /// Sliding-window width as a multiple of the probe timeout
    pub window_multiplier: f64,

    /// Load percentage above which a high-load alert fires
    pub load_threshold: f64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
            heartbeat_timeout: Duration::from_secs(90),
            failure_threshold: 3,
            window_multiplier: 3.5,
            load_threshold: 80.0,
        }
    }
}

impl HealthCheckConfig {
    /// Width of the circuit breaker's sliding failure window
    pub fn failure_window(&self) -> Duration {
        Duration::from_millis((self.timeout.as_millis() as f64 * self.window_multiplier) as u64)
    }
}

/// Webhook alert delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// Notification relay endpoint (Discord DM-by-email bridge)
    pub api_url: String,
    /// Recipient resolved by the relay
    pub recipient_email: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "http://gateway:8000/api/v1/notifications/discord/dm-by-email".to_string(),
            recipient_email: String::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter, overridable via RUST_LOG
    pub level: String,
    /// Output format: "text" or "json"
    pub format: String,
    /// Log file consumed by the log-retrieval endpoints; empty disables it
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "service_discovery=info".to_string(),
            format: "text".to_string(),
            file: "logs/service-discovery.log".to_string(),
        }
    }
}

impl DiscoveryConfig {
    /// Load configuration from a YAML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> DiscoveryResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DiscoveryError::config(format!("Failed to read config file: {}", e)))?;

        let mut config: DiscoveryConfig = serde_yaml::from_str(&content)
            .map_err(|e| DiscoveryError::config(format!("Failed to parse config: {}", e)))?;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the path in `DISCOVERY_CONFIG_PATH`, or fall back to defaults
    /// (with env overrides applied) when no config file is configured or the
    /// default path does not exist.
    pub async fn load() -> DiscoveryResult<Self> {
        match std::env::var("DISCOVERY_CONFIG_PATH") {
            Ok(path) => Self::load_from_file(path).await,
            Err(_) => {
                let default_path = "config/discovery.yaml";
                if tokio::fs::try_exists(default_path).await.unwrap_or(false) {
                    Self::load_from_file(default_path).await
                } else {
                    let mut config = Self::default();
                    config.apply_env_overrides()?;
                    config.validate()?;
                    Ok(config)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Variables follow the pattern `DISCOVERY_<SECTION>_<FIELD>`,
    /// e.g. `DISCOVERY_SERVER_PORT=8500`.
    pub fn apply_env_overrides(&mut self) -> DiscoveryResult<()> {
        use std::env;

        if let Ok(addr) = env::var("DISCOVERY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }

        if let Ok(port) = env::var("DISCOVERY_SERVER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| DiscoveryError::config(format!("Invalid DISCOVERY_SERVER_PORT: {}", e)))?;
        }

        if let Ok(interval) = env::var("DISCOVERY_HEALTH_CHECK_INTERVAL") {
            self.health_check.interval = humantime::parse_duration(&interval).map_err(|e| {
                DiscoveryError::config(format!("Invalid DISCOVERY_HEALTH_CHECK_INTERVAL: {}", e))
            })?;
        }

        if let Ok(timeout) = env::var("DISCOVERY_HEALTH_CHECK_TIMEOUT") {
            self.health_check.timeout = humantime::parse_duration(&timeout).map_err(|e| {
                DiscoveryError::config(format!("Invalid DISCOVERY_HEALTH_CHECK_TIMEOUT: {}", e))
            })?;
        }

        if let Ok(timeout) = env::var("DISCOVERY_HEARTBEAT_TIMEOUT") {
            self.health_check.heartbeat_timeout =
                humantime::parse_duration(&timeout).map_err(|e| {
                    DiscoveryError::config(format!("Invalid DISCOVERY_HEARTBEAT_TIMEOUT: {}", e))
                })?;
        }

        if let Ok(threshold) = env::var("DISCOVERY_FAILURE_THRESHOLD") {
            self.health_check.failure_threshold = threshold.parse().map_err(|e| {
                DiscoveryError::config(format!("Invalid DISCOVERY_FAILURE_THRESHOLD: {}", e))
            })?;
        }

        if let Ok(multiplier) = env::var("DISCOVERY_WINDOW_MULTIPLIER") {
            self.health_check.window_multiplier = multiplier.parse().map_err(|e| {
                DiscoveryError::config(format!("Invalid DISCOVERY_WINDOW_MULTIPLIER: {}", e))
            })?;
        }

        if let Ok(threshold) = env::var("DISCOVERY_LOAD_THRESHOLD") {
            self.health_check.load_threshold = threshold.parse().map_err(|e| {
                DiscoveryError::config(format!("Invalid DISCOVERY_LOAD_THRESHOLD: {}", e))
            })?;
        }

        if let Ok(enabled) = env::var("DISCOVERY_NOTIFICATIONS_ENABLED") {
            self.notifications.enabled = enabled.parse().map_err(|e| {
                DiscoveryError::config(format!("Invalid DISCOVERY_NOTIFICATIONS_ENABLED: {}", e))
            })?;
        }

        if let Ok(url) = env::var("DISCOVERY_NOTIFICATIONS_API_URL") {
            self.notifications.api_url = url;
        }

        if let Ok(email) = env::var("DISCOVERY_NOTIFICATIONS_RECIPIENT_EMAIL") {
            self.notifications.recipient_email = email;
        }

        if let Ok(level) = env::var("DISCOVERY_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = env::var("DISCOVERY_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(file) = env::var("DISCOVERY_LOG_FILE") {
            self.logging.file = file;
        }

        Ok(())
    }

    /// Validate the configuration, collecting every problem before failing
    pub fn validate(&self) -> DiscoveryResult<()> {
        let mut errors = Vec::new();

        if self.server.bind_address.is_empty() {
            errors.push("server.bind_address cannot be empty".to_string());
        }

        if self.server.port == 0 {
            errors.push("server.port must be greater than 0".to_string());
        }

        if self.health_check.interval.is_zero() {
            errors.push("health_check.interval must be greater than 0".to_string());
        }

        if self.health_check.timeout.is_zero() {
            errors.push("health_check.timeout must be greater than 0".to_string());
        }

        if self.health_check.heartbeat_timeout.is_zero() {
            errors.push("health_check.heartbeat_timeout must be greater than 0".to_string());
        }

        if self.health_check.failure_threshold == 0 {
            errors.push("health_check.failure_threshold must be at least 1".to_string());
        }

        if self.health_check.window_multiplier <= 0.0 {
            errors.push("health_check.window_multiplier must be positive".to_string());
        }

        if !(0.0..=100.0).contains(&self.health_check.load_threshold) {
            errors.push("health_check.load_threshold must be between 0 and 100".to_string());
        }

        if self.notifications.enabled && self.notifications.api_url.is_empty() {
            errors.push("notifications.api_url cannot be empty when notifications are enabled".to_string());
        }

        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => errors.push(format!("logging.format must be 'text' or 'json', got '{}'", other)),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DiscoveryError::config(format!(
                "Configuration validation failed: {}",
                errors.join("; ")
            )))
        }
    }
}
