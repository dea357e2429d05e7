//! Runtime lifecycle coordination for HTTP services.
//!
//! Detects where the process runs, tracks its lifecycle state, serves
//! kubernetes probes and orchestrates graceful shutdown.

pub mod config;
pub mod coordinator;
pub mod environment;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::LifecycleConfig;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use environment::RuntimeEnvironment;
pub use health::LifecycleStatus;
pub use http::{LifecycleServer, ServeError};
pub use lifecycle::{LifecycleError, LifecycleState};
