//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → request context middleware
//!     → connection.rs (guard held until the response is produced)
//!     → Hand off to the application router
//!
//! On shutdown:
//!     listener stops accepting → wait_for_drain() → count reaches zero
//! ```
//!
//! # Design Decisions
//! - Each request tracked for graceful shutdown
//! - Drain waiters are woken, not polled

pub mod connection;

pub use connection::{ConnectionGuard, ConnectionTracker, RequestId};
