//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle transitions and shutdown outcomes produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (state gauge, shutdown counters and durations)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging with fields, not formatted strings
//! - Metrics are cheap (facade calls, no-op without a recorder)

pub mod logging;
pub mod metrics;
