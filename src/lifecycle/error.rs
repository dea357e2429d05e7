//! Lifecycle error types surfaced at the end of shutdown.

use std::time::Duration;

use thiserror::Error;

/// Why a shutdown did not complete cleanly.
///
/// Passed to the `error` hook and the terminal `shutdown` event, and returned
/// from [`Coordinator::serve`](crate::Coordinator::serve).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Drain or cleanup was still running when the timeout expired.
    #[error("shutdown timed out after {timeout:?}")]
    ShutdownTimeout { timeout: Duration },

    /// The `closing` hook returned an error.
    #[error("cleanup hook failed: {0}")]
    Cleanup(String),
}

impl LifecycleError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LifecycleError::ShutdownTimeout { .. })
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::ShutdownTimeout { .. } => "timeout",
            LifecycleError::Cleanup(_) => "cleanup",
        }
    }
}
