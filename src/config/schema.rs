//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the recorder.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Name of the environment in which a local `config.toml` is picked up.
pub const DEVELOPMENT: &str = "development";

/// Root configuration for the recording proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Deployment environment name (e.g. "development").
    pub environment: String,

    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// The real API being proxied.
    pub upstream: UpstreamConfig,

    /// The mock server whose admin API receives recorded stubs.
    pub mock_server: MockServerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Stub recording settings.
    pub recording: RecordingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            environment: "Environment Not Specified".to_string(),
            listener: ListenerConfig::default(),
            upstream: UpstreamConfig::default(),
            mock_server: MockServerConfig::default(),
            timeouts: TimeoutConfig::default(),
            recording: RecordingConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// True when running in the development environment.
    pub fn is_development(&self) -> bool {
        self.environment == DEVELOPMENT
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8888").
    pub bind_address: String,

    /// Largest request or response body that is buffered for recording.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8888".to_string(),
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the real API (e.g., "https://api.example.com").
    pub target_url: String,

    /// Optional forward proxy used for every upstream call.
    pub proxy_url: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            target_url: "http://localhost:8080".to_string(),
            proxy_url: None,
        }
    }
}

/// Mock server admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MockServerConfig {
    /// Base URL of the mock server; `/__admin/...` is appended.
    pub admin_url: String,

    /// Timeout for each admin call in seconds.
    pub timeout_secs: u64,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            admin_url: "http://localhost:8081".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 10,
        }
    }
}

/// Stub recording configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Record stubs at all. When false the proxy is a plain pass-through.
    pub enabled: bool,

    /// JSON keys stripped from request bodies before they become match patterns.
    pub volatile_fields: Vec<String>,

    /// Run recording pipelines off the response path.
    pub detached: bool,

    /// Maximum number of exchanges waiting for a detached pipeline.
    pub queue_capacity: usize,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volatile_fields: vec!["modifiedOn".to_string()],
            detached: true,
            queue_capacity: 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
