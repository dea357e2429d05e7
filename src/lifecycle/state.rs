//! Service lifecycle state machine.
//!
//! # States
//! - Starting: process is up, not yet accepting traffic
//! - Ready: accepting traffic, readiness probe succeeds
//! - ShuttingDown: readiness fails, in-flight work drains
//! - ShutDown: terminal
//!
//! # State Transitions
//! ```text
//! Starting → Ready:            mark_ready()
//! Starting → ShuttingDown:     begin_shutdown() before readiness
//! Ready → ShuttingDown:        begin_shutdown()
//! ShuttingDown → ShutDown:     mark_shutdown(error)
//! ```
//!
//! # Design Decisions
//! - Transitions are compare-and-set on a watch channel, safe on any runtime flavour
//! - Every transition fires its event at most once
//! - Calls that do not match the current state are no-ops, never errors

use std::fmt;
use std::sync::OnceLock;

use serde::Serialize;
use tokio::sync::watch;

use crate::lifecycle::hooks::{BoxError, LifecycleHooks};
use crate::lifecycle::LifecycleError;
use crate::observability::metrics;

/// Lifecycle state of a service instance. Ordered by progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Starting,
    Ready,
    ShuttingDown,
    ShutDown,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Ready => "ready",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::ShutDown => "shut_down",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns the single [`LifecycleState`] of a service and fires its hooks.
pub struct StateMachine {
    state: watch::Sender<LifecycleState>,
    hooks: LifecycleHooks,
    outcome: OnceLock<Option<LifecycleError>>,
}

impl StateMachine {
    pub fn new(hooks: LifecycleHooks) -> Self {
        metrics::record_state(LifecycleState::Starting);
        Self {
            state: watch::Sender::new(LifecycleState::Starting),
            hooks,
            outcome: OnceLock::new(),
        }
    }

    pub fn current_state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// True only while the state is exactly `Ready`.
    pub fn is_ready(&self) -> bool {
        self.current_state() == LifecycleState::Ready
    }

    /// True until the terminal state is reached.
    pub fn is_alive(&self) -> bool {
        self.current_state() != LifecycleState::ShutDown
    }

    pub fn is_shutting_down(&self) -> bool {
        self.current_state() >= LifecycleState::ShuttingDown
    }

    /// `Starting → Ready`. Returns false if the machine was anywhere else.
    pub fn mark_ready(&self) -> bool {
        if !self.transition(|s| s == LifecycleState::Starting, LifecycleState::Ready) {
            tracing::debug!(state = %self.current_state(), "mark_ready ignored");
            return false;
        }
        tracing::info!("Lifecycle: service ready");
        self.hooks.fire_ready();
        true
    }

    /// `Starting | Ready → ShuttingDown`. The `close` hook has run by the
    /// time this returns. Returns false if shutdown had already begun.
    pub fn begin_shutdown(&self) -> bool {
        if !self.transition(
            |s| s < LifecycleState::ShuttingDown,
            LifecycleState::ShuttingDown,
        ) {
            tracing::debug!(state = %self.current_state(), "begin_shutdown ignored");
            return false;
        }
        tracing::info!("Lifecycle: shutting down");
        self.hooks.fire_close();
        true
    }

    /// `ShuttingDown → ShutDown`. Terminal. Fires `error` (when `error` is
    /// set) and `shutdown`. Returns false if not currently shutting down.
    pub fn mark_shutdown(&self, error: Option<LifecycleError>) -> bool {
        // The outcome is stored under the channel lock so anyone observing
        // `ShutDown` also observes it.
        let changed = self.state.send_if_modified(|state| {
            if *state != LifecycleState::ShuttingDown {
                return false;
            }
            let _ = self.outcome.set(error);
            *state = LifecycleState::ShutDown;
            true
        });
        if !changed {
            tracing::debug!(state = %self.current_state(), "mark_shutdown ignored");
            return false;
        }
        metrics::record_state(LifecycleState::ShutDown);

        let error = self.outcome.get().and_then(Option::as_ref);
        match error {
            None => tracing::info!("Lifecycle: shutdown complete"),
            Some(e) => tracing::warn!(
                error = %e,
                kind = e.kind(),
                "Lifecycle: shutdown complete with error"
            ),
        }
        self.hooks.fire_shutdown(error);
        true
    }

    /// Resolves once the machine has reached `target` or any later state.
    pub async fn wait_for(&self, target: LifecycleState) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|s| *s >= target).await;
    }

    /// Receiver that observes every transition.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// The terminal error, once `ShutDown` has been reached.
    pub fn outcome(&self) -> Option<Option<LifecycleError>> {
        self.outcome.get().cloned()
    }

    pub(crate) fn run_closing(&self) -> futures_util::future::BoxFuture<'static, Result<(), BoxError>> {
        self.hooks.run_closing()
    }

    fn transition(&self, allowed: impl Fn(LifecycleState) -> bool, to: LifecycleState) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if allowed(*state) {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            metrics::record_state(to);
        }
        changed
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("state", &self.current_state())
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn full_progression() {
        let machine = StateMachine::new(LifecycleHooks::new());
        assert_eq!(machine.current_state(), LifecycleState::Starting);
        assert!(!machine.is_ready());

        assert!(machine.mark_ready());
        assert!(machine.is_ready());

        assert!(machine.begin_shutdown());
        assert!(!machine.is_ready());
        assert!(machine.is_alive());

        assert!(machine.mark_shutdown(None));
        assert_eq!(machine.current_state(), LifecycleState::ShutDown);
        assert!(!machine.is_alive());
        assert_eq!(machine.outcome(), Some(None));
    }

    #[test]
    fn mark_ready_fires_once() {
        let (count, hook) = counter();
        let machine = StateMachine::new(LifecycleHooks::new().on_ready(hook));

        assert!(machine.mark_ready());
        assert!(!machine.mark_ready());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mark_ready_after_shutdown_is_ignored() {
        let (count, hook) = counter();
        let machine = StateMachine::new(LifecycleHooks::new().on_ready(hook));

        assert!(machine.begin_shutdown());
        assert!(!machine.mark_ready());
        assert_eq!(machine.current_state(), LifecycleState::ShuttingDown);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn begin_shutdown_is_idempotent() {
        let (count, hook) = counter();
        let machine = StateMachine::new(LifecycleHooks::new().on_close(hook));
        machine.mark_ready();

        assert!(machine.begin_shutdown());
        assert!(!machine.begin_shutdown());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_hook_sees_readiness_already_false() {
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        let machine = Arc::new_cyclic(|weak: &std::sync::Weak<StateMachine>| {
            let weak = weak.clone();
            StateMachine::new(LifecycleHooks::new().on_close(move || {
                if let Some(machine) = weak.upgrade() {
                    *s.lock().unwrap() = Some((machine.is_ready(), machine.current_state()));
                }
            }))
        });
        machine.mark_ready();
        machine.begin_shutdown();

        assert_eq!(
            *seen.lock().unwrap(),
            Some((false, LifecycleState::ShuttingDown))
        );
    }

    #[test]
    fn mark_shutdown_requires_shutting_down() {
        let machine = StateMachine::new(LifecycleHooks::new());
        assert!(!machine.mark_shutdown(None));
        assert_eq!(machine.current_state(), LifecycleState::Starting);
        assert_eq!(machine.outcome(), None);
    }

    #[test]
    fn mark_shutdown_is_terminal() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = errors.clone();
        let machine = StateMachine::new(LifecycleHooks::new().on_error(move |err| {
            e.lock().unwrap().push(err.clone());
        }));

        let timeout = LifecycleError::ShutdownTimeout {
            timeout: Duration::from_millis(5),
        };
        machine.begin_shutdown();
        assert!(machine.mark_shutdown(Some(timeout.clone())));
        assert!(!machine.mark_shutdown(None));
        assert!(!machine.begin_shutdown());
        assert!(!machine.mark_ready());

        assert_eq!(*errors.lock().unwrap(), vec![timeout.clone()]);
        assert_eq!(machine.outcome(), Some(Some(timeout)));
    }

    #[test]
    fn concurrent_begin_shutdown_fires_once() {
        let (count, hook) = counter();
        let machine = Arc::new(StateMachine::new(LifecycleHooks::new().on_close(hook)));
        machine.mark_ready();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = machine.clone();
                std::thread::spawn(move || m.begin_shutdown())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wait_for_resolves_on_later_state() {
        let machine = Arc::new(StateMachine::new(LifecycleHooks::new()));
        let waiter = {
            let m = machine.clone();
            tokio::spawn(async move { m.wait_for(LifecycleState::Ready).await })
        };

        machine.begin_shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should resolve")
            .unwrap();
    }
}
