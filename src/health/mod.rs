//! Health signal subsystem.
//!
//! # Data Flow
//! ```text
//! StateMachine (lifecycle)
//!     → status.rs (shared read-only LifecycleStatus)
//!         → probes.rs (HTTP /live and /ready, kubernetes only)
//!         → request extensions (every request)
//!         → Coordinator::status() (in-process consumers)
//! ```
//!
//! # Design Decisions
//! - Readiness is exactly "state == Ready", no degraded state
//! - Runtime `none` reports a fixed status with no bookkeeping

pub mod probes;
pub mod status;

pub use probes::probe_router;
pub use status::{LifecycleStatus, StatusSnapshot};
