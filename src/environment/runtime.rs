//! Runtime environment classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where the service believes it is running.
///
/// `None` and `Auto` are configuration values only: a resolved runtime is
/// one of `Local`, `Container` or `Kubernetes`, or `None` when the
/// coordinator is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Detection, probes and shutdown hooks are all disabled.
    None,
    /// Detect at startup.
    #[default]
    Auto,
    /// Bare process on a host.
    Local,
    /// Inside a container runtime.
    Container,
    /// Inside a kubernetes pod; probes are served over HTTP.
    Kubernetes,
}

impl RuntimeEnvironment {
    /// All accepted configuration values.
    pub const VALUES: [&'static str; 5] = ["none", "auto", "local", "container", "kubernetes"];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeEnvironment::None => "none",
            RuntimeEnvironment::Auto => "auto",
            RuntimeEnvironment::Local => "local",
            RuntimeEnvironment::Container => "container",
            RuntimeEnvironment::Kubernetes => "kubernetes",
        }
    }

    /// Whether the coordinator does any bookkeeping at all.
    pub fn is_enabled(&self) -> bool {
        *self != RuntimeEnvironment::None
    }

    /// Whether liveness/readiness are registered as HTTP routes.
    pub fn serves_probes(&self) -> bool {
        *self == RuntimeEnvironment::Kubernetes
    }
}

impl fmt::Display for RuntimeEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised runtime string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid runtime {0:?}, expected one of none, auto, local, container, kubernetes")]
pub struct ParseRuntimeError(String);

impl FromStr for RuntimeEnvironment {
    type Err = ParseRuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(RuntimeEnvironment::None),
            "auto" => Ok(RuntimeEnvironment::Auto),
            "local" => Ok(RuntimeEnvironment::Local),
            "container" => Ok(RuntimeEnvironment::Container),
            "kubernetes" => Ok(RuntimeEnvironment::Kubernetes),
            _ => Err(ParseRuntimeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_display() {
        for value in RuntimeEnvironment::VALUES {
            let runtime: RuntimeEnvironment = value.parse().unwrap();
            assert_eq!(runtime.to_string(), value);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(
            "Kubernetes".parse::<RuntimeEnvironment>(),
            Ok(RuntimeEnvironment::Kubernetes)
        );
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!("swarm".parse::<RuntimeEnvironment>().is_err());
    }

    #[test]
    fn only_kubernetes_serves_probes() {
        assert!(RuntimeEnvironment::Kubernetes.serves_probes());
        assert!(!RuntimeEnvironment::Container.serves_probes());
        assert!(!RuntimeEnvironment::None.is_enabled());
    }
}
