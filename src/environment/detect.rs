//! Runtime detection.
//!
//! # Responsibilities
//! - Recognise a kubernetes pod from its injected environment
//! - Recognise a container from the init process cgroup file
//! - Fall back to a local process
//!
//! # Design Decisions
//! - Strict priority: kubernetes variables, then the marker file, then local
//! - Marker read failures are never fatal, detection simply continues
//! - Runs once at startup, nothing is cached

use std::io;
use std::path::Path;

use crate::config::LifecycleConfig;
use crate::environment::RuntimeEnvironment;

/// Injected into every pod by the kubelet.
pub const KUBERNETES_SERVICE_HOST: &str = "KUBERNETES_SERVICE_HOST";

/// Explicit override for clusters that do not inject service variables.
pub const K8S_FLAG: &str = "K8S";

/// Substrings found in the init cgroup of known container runtimes.
pub const CONTAINER_SIGNATURES: [&str; 7] = [
    "docker",
    "kubepods",
    "containerd",
    "podman",
    "libpod",
    "lxc",
    "crio",
];

/// Source of environment variables and marker file contents.
pub trait EnvSource {
    /// Look up an environment variable.
    fn var(&self, key: &str) -> Option<String>;

    /// Read the container marker file.
    fn read_marker(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// The real process environment and file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Why detection settled on its answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionReason {
    /// `KUBERNETES_SERVICE_HOST` was set.
    ServiceHost,
    /// `K8S` was a true flag.
    Flag,
    /// The marker file contained a runtime signature.
    Marker { signature: &'static str },
    /// Nothing matched.
    Fallback,
}

/// Outcome of [`detect_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub runtime: RuntimeEnvironment,
    pub reason: DetectionReason,
}

/// Detect the runtime from the process environment.
pub fn detect(config: &LifecycleConfig) -> RuntimeEnvironment {
    detect_with(config, &ProcessEnv).runtime
}

/// Detect the runtime from an arbitrary environment source.
pub fn detect_with<E: EnvSource + ?Sized>(config: &LifecycleConfig, env: &E) -> Detection {
    if env.var(KUBERNETES_SERVICE_HOST).is_some_and(|v| !v.is_empty()) {
        return Detection {
            runtime: RuntimeEnvironment::Kubernetes,
            reason: DetectionReason::ServiceHost,
        };
    }

    if env.var(K8S_FLAG).is_some_and(|v| is_truthy(&v)) {
        return Detection {
            runtime: RuntimeEnvironment::Kubernetes,
            reason: DetectionReason::Flag,
        };
    }

    if !config.container_endpoint.is_empty() {
        let path = Path::new(&config.container_endpoint);
        match env.read_marker(path) {
            Ok(contents) => {
                if let Some(signature) = container_signature(&contents) {
                    return Detection {
                        runtime: RuntimeEnvironment::Container,
                        reason: DetectionReason::Marker { signature },
                    };
                }
            }
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %e,
                    "Container marker unreadable, skipping"
                );
            }
        }
    }

    Detection {
        runtime: RuntimeEnvironment::Local,
        reason: DetectionReason::Fallback,
    }
}

/// Resolve the configured runtime.
///
/// `auto` runs detection; explicit values and `none` are returned without
/// touching the environment.
pub fn resolve(config: &LifecycleConfig) -> RuntimeEnvironment {
    resolve_with(config, &ProcessEnv)
}

/// [`resolve`] against an arbitrary environment source.
pub fn resolve_with<E: EnvSource + ?Sized>(config: &LifecycleConfig, env: &E) -> RuntimeEnvironment {
    match config.runtime {
        RuntimeEnvironment::Auto => {
            let detection = detect_with(config, env);
            tracing::info!(
                runtime = %detection.runtime,
                reason = ?detection.reason,
                "Runtime detected"
            );
            detection.runtime
        }
        explicit => {
            tracing::debug!(runtime = %explicit, "Runtime configured explicitly");
            explicit
        }
    }
}

/// First known runtime signature in the marker contents, if any.
pub fn container_signature(contents: &str) -> Option<&'static str> {
    let haystack = contents.to_ascii_lowercase();
    CONTAINER_SIGNATURES
        .into_iter()
        .find(|signature| haystack.contains(signature))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
