//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Lifecycle hooks are not part of the schema; they are registered in code
//! on [`crate::CoordinatorBuilder`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::environment::RuntimeEnvironment;

/// Root configuration for the demo service binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener settings.
    pub server: ServerConfig,

    /// Lifecycle coordinator settings.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Lifecycle coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Runtime override, or `auto` to detect.
    pub runtime: RuntimeEnvironment,

    /// Hard ceiling on the shutdown sequence, in milliseconds.
    #[serde(alias = "timeout")]
    pub timeout_ms: u64,

    /// Liveness probe path (kubernetes only).
    pub liveness_endpoint: String,

    /// Readiness probe path (kubernetes only).
    pub readiness_endpoint: String,

    /// File inspected for container runtime signatures. Empty disables the check.
    pub container_endpoint: String,
}

impl LifecycleConfig {
    /// Shutdown timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeEnvironment::Auto,
            timeout_ms: 10_000,
            liveness_endpoint: "/live".to_string(),
            readiness_endpoint: "/ready".to_string(),
            container_endpoint: "/proc/1/cgroup".to_string(),
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
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
