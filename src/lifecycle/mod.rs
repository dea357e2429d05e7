//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! State machine (state.rs):
//!     Starting → Ready → ShuttingDown → ShutDown
//!     Each transition fires its hook (hooks.rs) once
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Drain ∥ closing hook → Timeout ceiling → ShutDown
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     Repeated signal → ignored
//! ```
//!
//! # Design Decisions
//! - Transitions are monotonic and never move backward
//! - Only one shutdown sequence per process
//! - Shutdown has a hard timeout: forced completion after the deadline

pub mod error;
pub mod hooks;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use error::LifecycleError;
pub use hooks::{BoxError, LifecycleHooks};
pub use shutdown::{ShutdownOrchestrator, ShutdownReason, ShutdownTrigger};
pub use state::{LifecycleState, StateMachine};
