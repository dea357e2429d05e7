//! Read-only lifecycle status shared with the host.
//!
//! One value is created per coordinator and handed out by reference: to the
//! probe handlers, to router-wide state, and to every request's extensions.

use std::sync::Arc;

use serde::Serialize;

use crate::environment::RuntimeEnvironment;
use crate::lifecycle::{LifecycleState, StateMachine};

#[derive(Debug)]
enum Source {
    /// Runtime `none`: nothing is tracked.
    Fixed,
    Tracked(Arc<StateMachine>),
}

#[derive(Debug)]
struct StatusInner {
    runtime: RuntimeEnvironment,
    source: Source,
}

/// `{ runtime, ready() }` view of a service instance.
#[derive(Debug, Clone)]
pub struct LifecycleStatus {
    inner: Arc<StatusInner>,
}

/// Point-in-time copy of a [`LifecycleStatus`], returned by the probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub runtime: RuntimeEnvironment,
    pub state: Option<LifecycleState>,
    pub ready: bool,
}

impl LifecycleStatus {
    /// Status backed by a live state machine.
    pub fn tracked(runtime: RuntimeEnvironment, machine: Arc<StateMachine>) -> Self {
        Self {
            inner: Arc::new(StatusInner {
                runtime,
                source: Source::Tracked(machine),
            }),
        }
    }

    /// Status for a disabled coordinator: always ready, always alive.
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(StatusInner {
                runtime: RuntimeEnvironment::None,
                source: Source::Fixed,
            }),
        }
    }

    pub fn runtime(&self) -> RuntimeEnvironment {
        self.inner.runtime
    }

    /// Current state, or `None` when nothing is tracked.
    pub fn state(&self) -> Option<LifecycleState> {
        match &self.inner.source {
            Source::Fixed => None,
            Source::Tracked(machine) => Some(machine.current_state()),
        }
    }

    /// Whether new traffic should be routed here.
    pub fn ready(&self) -> bool {
        match &self.inner.source {
            Source::Fixed => true,
            Source::Tracked(machine) => machine.is_ready(),
        }
    }

    /// Whether the process has not yet finished shutting down.
    pub fn alive(&self) -> bool {
        match &self.inner.source {
            Source::Fixed => true,
            Source::Tracked(machine) => machine.is_alive(),
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            runtime: self.runtime(),
            state: self.state(),
            ready: self.ready(),
        }
    }

    /// Whether two handles refer to the same status.
    pub fn same_as(&self, other: &LifecycleStatus) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
