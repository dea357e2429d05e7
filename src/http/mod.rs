//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! Host router
//!     → middleware/request_context.rs (track request, attach status)
//!     → host handlers
//!
//! Probe routes (kubernetes only) are merged outside the middleware.
//!
//! server.rs:
//!     bind → mark ready → wait for shutdown → stop accepting → drain
//! ```

pub mod middleware;
pub mod server;

pub use server::{LifecycleServer, ServeError};
