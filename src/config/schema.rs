//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::settings::destination::DEFAULT_DESTINATION;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Tap proxy listener.
    pub listener: ListenerConfig,

    /// URL Pattern Filter.
    pub observer: ObserverConfig,

    /// Destination defaults, settings file and status icons.
    pub relay: RelaySettingsConfig,

    /// Options page and JSON API.
    pub options: OptionsConfig,

    /// Built-in header sink.
    pub sink: SinkConfig,

    /// Timeouts for traffic passing through the tap.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

/// Tap proxy listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:3128").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Base URL for origin-form requests (reverse mode). Unset means the tap
    /// only serves absolute-form proxy requests.
    pub upstream: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3128".to_string(),
            max_connections: 1_024,
            upstream: None,
        }
    }
}

/// URL Pattern Filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Match patterns, e.g. "https://example.service/*".
    pub patterns: Vec<String>,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            patterns: vec!["*://example.service/*".to_string()],
        }
    }
}

/// Relay settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelaySettingsConfig {
    /// Destination used while the stored setting is unset.
    pub default_destination: String,

    /// JSON file backing the settings store.
    pub settings_path: String,

    /// Icon shown after a delivered relay.
    pub success_icon: String,

    /// Icon shown after a failed relay.
    pub failure_icon: String,
}

impl Default for RelaySettingsConfig {
    fn default() -> Self {
        Self {
            default_destination: DEFAULT_DESTINATION.to_string(),
            settings_path: "header-relay.settings.json".to_string(),
            success_icon: "images/green.png".to_string(),
            failure_icon: "images/red.png".to_string(),
        }
    }
}

/// Options server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// Serve the options page and JSON API.
    pub enabled: bool,

    /// Options server bind address.
    pub bind_address: String,

    /// Bearer token required on `/api/*` when set.
    pub api_key: Option<String>,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
            api_key: None,
        }
    }
}

/// Header sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Run the sink alongside the tap.
    pub enabled: bool,

    /// Sink bind address; the default matches the default destination.
    pub bind_address: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Timeout configuration for proxied traffic. Relays use client defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Upstream request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body buffered by the tap, in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
