//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the mediator.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the mediator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MediatorConfig {
    /// Caller-facing request/reply settings.
    pub gateway: GatewayConfig,

    /// Queue bridge and redelivery settings.
    pub queue: QueueConfig,

    /// Outbound backend settings.
    pub backend: BackendConfig,

    /// Inbound HTTP facade settings.
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Correlation gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Deadline applied when a caller does not supply one, in milliseconds.
    pub default_deadline_ms: u64,
}

impl GatewayConfig {
    pub fn default_deadline(&self) -> Duration {
        Duration::from_millis(self.default_deadline_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_deadline_ms: 30_000,
        }
    }
}

/// Queue bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Number of delivery workers.
    pub workers: usize,

    /// Maximum redeliveries before a transient failure is abandoned.
    /// Absent means redeliver forever.
    pub max_redeliveries: Option<u32>,

    /// Delay before a rolled-back message is redelivered, in milliseconds.
    pub redelivery_delay_ms: u64,

    /// Upper bound for the redelivery delay when backoff is enabled.
    pub redelivery_max_delay_ms: u64,

    /// Grow the redelivery delay exponentially (with jitter).
    pub redelivery_backoff: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_redeliveries: None,
            redelivery_delay_ms: 100,
            redelivery_max_delay_ms: 2000,
            redelivery_backoff: false,
        }
    }
}

/// Backend collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend endpoint the request is POSTed to.
    pub url: String,

    /// Time budget for a single backend call, in milliseconds.
    pub timeout_ms: u64,

    /// Connection establishment timeout, in milliseconds.
    pub connect_timeout_ms: u64,

    /// `<status>` value meaning the request was accepted.
    pub success_marker: String,

    /// `<status>` value meaning access was denied.
    pub denied_marker: String,

    /// HTTP statuses treated as an authorization rejection.
    pub rejection_statuses: Vec<u16>,

    /// HTTP statuses treated as a transient failure and redelivered.
    /// Checked before `rejection_statuses` and the 4xx rule.
    pub transient_statuses: Vec<u16>,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9000/".to_string(),
            timeout_ms: 5000,
            connect_timeout_ms: 1000,
            success_marker: "ok".to_string(),
            denied_marker: "Access denied".to_string(),
            rejection_statuses: vec![401, 403, 404],
            transient_statuses: vec![408, 429],
        }
    }
}

/// Listener configuration for the inbound HTTP facade.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Upper bound on a single inbound HTTP request, in seconds.
    /// Must exceed any caller deadline.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
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
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

/// Placeholder key rejected by validation when the admin API is enabled.
pub const ADMIN_KEY_PLACEHOLDER: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: ADMIN_KEY_PLACEHOLDER.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
