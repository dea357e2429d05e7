//! Environment detection subsystem.
//!
//! # Data Flow
//! ```text
//! LifecycleConfig.runtime
//!     → none: coordinator disabled, nothing inspected
//!     → local | container | kubernetes: used as-is
//!     → auto: detect.rs
//!         KUBERNETES_SERVICE_HOST / K8S → kubernetes
//!         container marker file signature → container
//!         otherwise → local
//! ```

pub mod detect;
pub mod runtime;

pub use detect::{detect, detect_with, resolve, resolve_with, EnvSource, ProcessEnv};
pub use runtime::{ParseRuntimeError, RuntimeEnvironment};
