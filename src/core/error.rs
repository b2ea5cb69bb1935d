//! # Error Handling Module
//!
//! This module provides error handling for the service discovery registry using
//! the `thiserror` crate. It defines the error types that can cross the API
//! boundary and maps each of them to the HTTP status code clients should see.
//!
//! Only `NotFound` and `Validation` are caller-visible failures in normal
//! operation. Probe failures never become errors here: they stay inside the
//! health monitor and drive the circuit breaker instead. Alert delivery
//! failures are logged and discarded by the notification sink.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::convert::Infallible;
use thiserror::Error;

/// Main result type used throughout the registry
///
/// Type alias so call sites can write `DiscoveryResult<T>` instead of
/// `Result<T, DiscoveryError>` everywhere.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Error types for the service discovery registry
///
/// Each variant represents a different category of error. The `#[error("...")]`
/// attribute from `thiserror` implements the `Display` trait with the given
/// message.
#[derive(Debug, Error, Clone)]
pub enum DiscoveryError {
    /// Configuration-related errors (invalid config file, bad values, etc.)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A referenced service instance does not exist in the registry
    #[error("Service instance not found: {instance_id}")]
    NotFound { instance_id: String },

    /// Request validation errors (blank required fields, out-of-range params)
    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    /// I/O errors (log file access, bind failures, etc.)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// YAML parsing errors for configuration files
    #[error("YAML error: {message}")]
    Yaml { message: String },

    /// HTTP client errors (webhook delivery, outbound requests)
    #[error("HTTP client error: {message}")]
    HttpClient { message: String },

    /// Internal errors for unexpected failures
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DiscoveryError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a not-found error for an instance id
    pub fn not_found<S: Into<String>>(instance_id: S) -> Self {
        Self::NotFound {
            instance_id: instance_id.into(),
        }
    }

    /// Create a validation error for a specific field
    pub fn validation<S: Into<String>>(field: S, reason: S) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Json { .. } => StatusCode::BAD_REQUEST,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Yaml { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::HttpClient { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a string representation of the error type for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation_error",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
            Self::Yaml { .. } => "yaml_error",
            Self::HttpClient { .. } => "http_client_error",
            Self::Internal { .. } => "internal_error",
        }
    }
}

impl From<Infallible> for DiscoveryError {
    fn from(infallible: Infallible) -> Self {
        match infallible {}
    }
}

impl From<std::io::Error> for DiscoveryError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for DiscoveryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for DiscoveryError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for DiscoveryError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpClient {
            message: err.to_string(),
        }
    }
}

/// Convert errors into HTTP responses automatically
///
/// This lets handlers return `DiscoveryResult<T>` and have axum render the
/// failure as a structured JSON error with the right status code.
impl IntoResponse for DiscoveryError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_response = json!({
            "success": false,
            "message": self.to_string(),
            "error": {
                "code": status.as_u16(),
                "type": self.error_type(),
            }
        });

        (status, Json(error_response)).into_response()
    }
}
