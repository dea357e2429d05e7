//! Shutdown coordination.
//!
//! # Sequence
//! ```text
//! initiate(reason)
//!     → StateMachine::begin_shutdown()   (readiness fails, `close` hook runs)
//!     → ShutdownTrigger::trigger()       (listener stops accepting)
//!     → deadline = now + timeout
//! complete(drain)
//!     → drain ∥ in-flight requests ∥ `closing` hook, raced against deadline
//!     → StateMachine::mark_shutdown(error-or-none)
//! ```
//!
//! # Design Decisions
//! - Only the first trigger starts the sequence; later ones are logged and dropped
//! - The deadline is fixed at the first trigger and never re-armed
//! - A cleanup failure is reported even if the deadline later expires

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::lifecycle::{BoxError, LifecycleError, LifecycleState, StateMachine};
use crate::net::ConnectionTracker;
use crate::observability::metrics;

/// Broadcasts "stop accepting" to every listener.
///
/// Late subscribers still observe a trigger that already happened.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(false)),
        }
    }

    /// Fire the trigger. Returns true only for the first call.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|fired| !std::mem::replace(fired, true))
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Future that resolves once the trigger has fired.
    pub fn triggered(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // The sender is kept alive by `self`'s clones; a closed channel
            // means every owner is gone and nothing is left to stop.
            let _ = rx.wait_for(|fired| *fired).await;
        }
    }

    /// Number of futures still waiting on the trigger.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ShutdownTrigger {
    fn default() -> Self {
        Self::new()
    }
}

/// What started the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGTERM, SIGINT or Ctrl-C.
    Signal(&'static str),
    /// `Coordinator::shutdown` was called.
    Requested,
    /// The server stopped without being asked to.
    ServerExited,
}

impl ShutdownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::Signal(_) => "signal",
            ShutdownReason::Requested => "requested",
            ShutdownReason::ServerExited => "server_exited",
        }
    }
}

/// Runs the shutdown sequence exactly once.
#[derive(Debug)]
pub struct ShutdownOrchestrator {
    machine: Arc<StateMachine>,
    tracker: ConnectionTracker,
    trigger: ShutdownTrigger,
    timeout: Duration,
    started_at: OnceLock<Instant>,
    completing: AtomicBool,
}

impl ShutdownOrchestrator {
    pub fn new(
        machine: Arc<StateMachine>,
        tracker: ConnectionTracker,
        trigger: ShutdownTrigger,
        timeout: Duration,
    ) -> Self {
        Self {
            machine,
            tracker,
            trigger,
            timeout,
            started_at: OnceLock::new(),
            completing: AtomicBool::new(false),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Begin shutdown. Returns false if a sequence is already running.
    pub fn initiate(&self, reason: ShutdownReason) -> bool {
        if !self.machine.begin_shutdown() {
            return false;
        }
        self.started_at.get_or_init(Instant::now);
        metrics::record_shutdown_initiated(reason.as_str());

        match reason {
            ShutdownReason::Signal(signal) => tracing::info!(
                trigger_reason = reason.as_str(),
                signal,
                timeout_ms = self.timeout.as_millis() as u64,
                in_flight = self.tracker.active_count(),
                "Lifecycle: shutdown initiated"
            ),
            _ => tracing::info!(
                trigger_reason = reason.as_str(),
                timeout_ms = self.timeout.as_millis() as u64,
                in_flight = self.tracker.active_count(),
                "Lifecycle: shutdown initiated"
            ),
        }

        self.trigger.trigger();
        true
    }

    /// Wait for `drain`, in-flight requests and the `closing` hook, bounded
    /// by the timeout, then move to the terminal state.
    ///
    /// Starts the sequence with [`ShutdownReason::Requested`] if nothing has
    /// yet. A second caller waits for the first and gets the same outcome.
    pub async fn complete<F>(&self, drain: F) -> Option<LifecycleError>
    where
        F: Future<Output = ()>,
    {
        self.initiate(ShutdownReason::Requested);

        if self.completing.swap(true, Ordering::SeqCst) {
            self.machine.wait_for(LifecycleState::ShutDown).await;
            return self.machine.outcome().flatten();
        }

        let started_at = *self.started_at.get_or_init(Instant::now);
        let deadline = tokio::time::sleep_until(started_at + self.timeout);
        tokio::pin!(deadline);

        let tracker = self.tracker.clone();
        let drain = async move {
            drain.await;
            tracker.wait_for_drain().await;
        };
        tokio::pin!(drain);

        // A panicking hook must still end in `ShutDown`.
        let cleanup = AssertUnwindSafe(async { self.machine.run_closing().await })
            .catch_unwind()
            .map(|result| {
                result.unwrap_or_else(|panic| {
                    Err(BoxError::from(format!(
                        "closing hook panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                })
            });
        tokio::pin!(cleanup);

        let mut drained = false;
        let mut cleanup_result = None;
        let mut timed_out = false;

        while !(drained && cleanup_result.is_some()) {
            tokio::select! {
                _ = &mut drain, if !drained => {
                    drained = true;
                    tracing::debug!("Lifecycle: in-flight work drained");
                }
                result = &mut cleanup, if cleanup_result.is_none() => {
                    if let Err(e) = &result {
                        tracing::warn!(error = %e, "Lifecycle: closing hook failed");
                    }
                    cleanup_result = Some(result);
                }
                _ = &mut deadline => {
                    timed_out = true;
                    tracing::warn!(
                        drained,
                        cleanup_done = cleanup_result.is_some(),
                        in_flight = self.tracker.active_count(),
                        "Lifecycle: shutdown timeout reached, forcing completion"
                    );
                    break;
                }
            }
        }

        let error = match cleanup_result {
            Some(Err(e)) => Some(LifecycleError::Cleanup(e.to_string())),
            _ if timed_out => Some(LifecycleError::ShutdownTimeout {
                timeout: self.timeout,
            }),
            _ => None,
        };

        metrics::record_shutdown_completed(
            error.as_ref().map_or("clean", LifecycleError::kind),
            started_at.elapsed(),
        );
        self.machine.mark_shutdown(error.clone());
        error
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string payload"
    }
}
