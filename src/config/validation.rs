//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeout > 0)
//! - Validate probe paths
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LifecycleConfig → Result<(), Vec<ValidationError>>
//! - Runs before the coordinator is built, so misconfiguration fails before traffic

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{LifecycleConfig, ServiceConfig};

/// A single semantic configuration violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Shutdown timeout must be positive.
    #[error("lifecycle.timeout_ms must be greater than zero")]
    ZeroTimeout,

    /// Probe paths are registered as literal router paths.
    #[error("{field} must be a static path starting with '/', got {value:?}")]
    InvalidEndpoint { field: &'static str, value: String },

    /// Liveness and readiness cannot share a route.
    #[error("liveness and readiness endpoints are both {0:?}")]
    DuplicateEndpoint(String),

    /// Address could not be parsed.
    #[error("{field} is not a socket address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate the lifecycle section.
pub fn validate_lifecycle(config: &LifecycleConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    for (field, value) in [
        ("liveness_endpoint", &config.liveness_endpoint),
        ("readiness_endpoint", &config.readiness_endpoint),
    ] {
        if !is_static_path(value) {
            errors.push(ValidationError::InvalidEndpoint {
                field,
                value: value.clone(),
            });
        }
    }

    if config.liveness_endpoint == config.readiness_endpoint {
        errors.push(ValidationError::DuplicateEndpoint(
            config.liveness_endpoint.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Absolute path with no route captures or wildcards.
fn is_static_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.contains(['{', '}'])
        && !path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
}

/// Validate the whole service config.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_lifecycle(&config.lifecycle).err().unwrap_or_default();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
