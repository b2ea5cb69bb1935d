//! Webhook alert sink.
//!
//! Delivers alerts as direct messages through a notification relay (a
//! Discord DM-by-email bridge). The HTTP send is spawned onto its own task,
//! so a slow or failing relay never blocks the caller.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::core::config::NotificationConfig;
use crate::core::types::ServiceInstance;
use crate::notify::AlertSink;

const AUTHOR: &str = "ServiceDiscovery";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Alert sink posting Discord-formatted messages to a notification relay
pub struct WebhookAlertSink {
    client: reqwest::Client,
    config: NotificationConfig,
}

impl WebhookAlertSink {
    pub fn new(config: NotificationConfig) -> Self {
        if config.enabled && config.recipient_email.is_empty() {
            warn!("Notifications enabled but recipient email not configured");
        }

        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Dispatch a message to the relay, fire-and-forget
    ///
    /// Delivery errors are logged and dropped; nothing propagates to the
    /// health-check pass that triggered the alert.
    fn dispatch(&self, message: String) {
        if !self.config.enabled {
            debug!("Notifications disabled, skipping alert");
            return;
        }

        if self.config.recipient_email.is_empty() {
            warn!("Recipient email not configured, cannot send notification");
            return;
        }

        let client = self.client.clone();
        let url = self.config.api_url.clone();
        let body = json!({
            "message": message,
            "email": self.config.recipient_email,
            "author": AUTHOR,
        });

        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) => {
                    debug!(status = %response.status(), "Notification sent");
                }
                Err(e) => {
                    error!("Failed to send notification: {}", e);
                }
            }
        });
    }

    fn timestamp() -> String {
        Utc::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn notify_unhealthy(&self, instance: &ServiceInstance) {
        let message = format!(
            "⚠️ **SERVICE UNHEALTHY ALERT**\n\n\
             Service: `{}`\n\
             Instance ID: `{}`\n\
             Service URL: `{}`\n\
             Status: UNHEALTHY\n\
             Timestamp: {}",
            instance.service_name,
            instance.instance_id,
            instance.service_url,
            Self::timestamp(),
        );

        self.dispatch(message);
    }

    async fn notify_removed(&self, instance: &ServiceInstance, failure_count: u32) {
        let message = format!(
            "🔴 **SERVICE REMOVED BY CIRCUIT BREAKER**\n\n\
             Service: `{}`\n\
             Instance ID: `{}`\n\
             Service URL: `{}`\n\
             Failure Count: {}\n\
             Timestamp: {}\n\n\
             The service has been automatically removed from the registry due to repeated failures.",
            instance.service_name,
            instance.instance_id,
            instance.service_url,
            failure_count,
            Self::timestamp(),
        );

        self.dispatch(message);
    }

    async fn notify_high_load(&self, instance: &ServiceInstance, load_threshold: f64) {
        let message = format!(
            "📊 **HIGH LOAD ALERT**\n\n\
             Service: `{}`\n\
             Instance ID: `{}`\n\
             Service URL: `{}`\n\
             Current Load: {:.2}%\n\
             Threshold: {:.2}%\n\
             Request Count: {}\n\
             Timestamp: {}",
            instance.service_name,
            instance.instance_id,
            instance.service_url,
            instance.effective_load(),
            load_threshold,
            instance.request_count.unwrap_or(0),
            Self::timestamp(),
        );

        self.dispatch(message);
    }

    async fn notify_circuit_breaker_tripped(
        &self,
        instance_id: &str,
        service_name: &str,
        failure_count: u32,
    ) {
        let message = format!(
            "⚡ **CIRCUIT BREAKER TRIPPED**\n\n\
             Service: `{}`\n\
             Instance ID: `{}`\n\
             Failure Count: {}\n\
             Timestamp: {}\n\n\
             The circuit breaker has been activated for this service instance.",
            service_name,
            instance_id,
            failure_count,
            Self::timestamp(),
        );

        self.dispatch(message);
    }
}
