//! Lifecycle coordinator: the single handle a host service keeps.
//!
//! # Responsibilities
//! - Validate the lifecycle config and resolve the runtime once
//! - Own the state machine, connection tracker and shutdown orchestrator
//! - Wire probes and the request context middleware into an axum router
//! - Expose manual controls for hosts that do not use [`Coordinator::serve`]
//!
//! # Design Decisions
//! - Misconfiguration fails in `build()`, before any traffic
//! - Runtime `none` keeps the same API but every call is inert

use std::sync::Arc;

use axum::{middleware, Extension, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::validation::validate_lifecycle;
use crate::config::{ConfigError, LifecycleConfig};
use crate::environment::{resolve_with, EnvSource, ProcessEnv, RuntimeEnvironment};
use crate::health::{probe_router, LifecycleStatus};
use crate::http::middleware::{request_context_middleware, RequestContext};
use crate::http::server::{LifecycleServer, ServeError};
use crate::lifecycle::signals::spawn_signal_task;
use crate::lifecycle::{
    BoxError, LifecycleError, LifecycleHooks, LifecycleState, ShutdownOrchestrator,
    ShutdownReason, ShutdownTrigger, StateMachine,
};
use crate::net::ConnectionTracker;

/// Builder for [`Coordinator`].
pub struct CoordinatorBuilder {
    config: LifecycleConfig,
    hooks: LifecycleHooks,
    env: Box<dyn EnvSource>,
    trap_signals: bool,
}

impl CoordinatorBuilder {
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            config,
            hooks: LifecycleHooks::new(),
            env: Box::new(ProcessEnv),
            trap_signals: true,
        }
    }

    pub fn on_ready<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_ready(f);
        self
    }

    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_close(f);
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&LifecycleError) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_error(f);
        self
    }

    pub fn on_shutdown<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&LifecycleError>) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_shutdown(f);
        self
    }

    /// Async cleanup awaited during drain, bounded by the shutdown timeout.
    pub fn closing<F, Fut, E>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.hooks = self.hooks.closing(f);
        self
    }

    /// Environment consulted by `auto` detection (default: the real process).
    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Install SIGTERM/SIGINT handlers when serving (default: true).
    pub fn with_trap_signals(mut self, trap: bool) -> Self {
        self.trap_signals = trap;
        self
    }

    /// Validate the config, resolve the runtime and build the coordinator.
    pub fn build(self) -> Result<Coordinator, ConfigError> {
        validate_lifecycle(&self.config).map_err(ConfigError::Validation)?;

        let runtime = resolve_with(&self.config, self.env.as_ref());
        let enabled = runtime.is_enabled();

        // Runtime `none` disables every hook.
        let hooks = if enabled {
            self.hooks
        } else {
            LifecycleHooks::new()
        };

        let machine = Arc::new(StateMachine::new(hooks));
        let tracker = ConnectionTracker::new();
        let trigger = ShutdownTrigger::new();
        let orchestrator = Arc::new(ShutdownOrchestrator::new(
            machine.clone(),
            tracker.clone(),
            trigger.clone(),
            self.config.timeout(),
        ));
        let status = if enabled {
            LifecycleStatus::tracked(runtime, machine.clone())
        } else {
            LifecycleStatus::disabled()
        };

        tracing::info!(
            runtime = %runtime,
            timeout_ms = self.config.timeout_ms,
            probes = runtime.serves_probes(),
            liveness = %self.config.liveness_endpoint,
            readiness = %self.config.readiness_endpoint,
            "Lifecycle coordinator configured"
        );

        Ok(Coordinator {
            inner: Arc::new(CoordinatorInner {
                config: self.config,
                runtime,
                trap_signals: self.trap_signals,
                machine,
                tracker,
                trigger,
                orchestrator,
                status,
            }),
        })
    }
}

#[derive(Debug)]
struct CoordinatorInner {
    config: LifecycleConfig,
    runtime: RuntimeEnvironment,
    trap_signals: bool,
    machine: Arc<StateMachine>,
    tracker: ConnectionTracker,
    trigger: ShutdownTrigger,
    orchestrator: Arc<ShutdownOrchestrator>,
    status: LifecycleStatus,
}

/// Runtime lifecycle coordinator. Cheap to clone; clones share one lifecycle.
#[derive(Debug, Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

impl Coordinator {
    pub fn builder(config: LifecycleConfig) -> CoordinatorBuilder {
        CoordinatorBuilder::new(config)
    }

    /// Coordinator without hooks.
    pub fn new(config: LifecycleConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.inner.config
    }

    /// Resolved runtime; never `auto`.
    pub fn runtime(&self) -> RuntimeEnvironment {
        self.inner.runtime
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.runtime.is_enabled()
    }

    /// Shared read-only status, the same value requests see.
    pub fn status(&self) -> LifecycleStatus {
        self.inner.status.clone()
    }

    /// Current state, or `None` for runtime `none`.
    pub fn state(&self) -> Option<LifecycleState> {
        self.inner.status.state()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.status.ready()
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.inner.tracker
    }

    /// Signal that the server is accepting connections.
    pub fn mark_ready(&self) -> bool {
        self.is_enabled() && self.inner.machine.mark_ready()
    }

    /// Begin shutdown: readiness fails and the listener stops accepting.
    /// Returns false if shutdown had already begun.
    pub fn shutdown(&self) -> bool {
        if !self.is_enabled() {
            return self.inner.trigger.trigger();
        }
        self.inner.orchestrator.initiate(ShutdownReason::Requested)
    }

    /// Run the drain/cleanup phase for hosts that manage their own server.
    ///
    /// Begins shutdown if needed, waits for tracked requests and the
    /// `closing` hook within the timeout, and returns the terminal error.
    pub async fn drain(&self) -> Option<LifecycleError> {
        if !self.is_enabled() {
            self.inner.trigger.trigger();
            return None;
        }
        self.inner.orchestrator.complete(async {}).await
    }

    /// Resolves once shutdown has finished, with its error if any.
    pub async fn wait_for_shutdown(&self) -> Option<LifecycleError> {
        if !self.is_enabled() {
            self.inner.trigger.triggered().await;
            return None;
        }
        self.inner.machine.wait_for(LifecycleState::ShutDown).await;
        self.inner.machine.outcome().flatten()
    }

    /// Add probe routes (kubernetes only) and the request context layer.
    ///
    /// Probe requests are not counted as in-flight work. With runtime `none`
    /// requests still see the fixed status but nothing is tracked.
    pub fn attach(&self, router: Router) -> Router {
        if !self.is_enabled() {
            return router.layer(Extension(self.status()));
        }

        let ctx = RequestContext {
            status: self.status(),
            tracker: self.inner.tracker.clone(),
        };
        let app = router.layer(middleware::from_fn_with_state(
            ctx,
            request_context_middleware,
        ));

        if self.inner.runtime.serves_probes() {
            app.merge(probe_router(&self.inner.config, self.status()))
        } else {
            app
        }
    }

    /// Serve `router` on `listener` until shutdown completes.
    ///
    /// Returns the terminal lifecycle error, if any; server I/O failures are
    /// returned as [`ServeError`].
    pub async fn serve(
        &self,
        listener: TcpListener,
        router: Router,
    ) -> Result<Option<LifecycleError>, ServeError> {
        LifecycleServer::new(self.clone(), router).run(listener).await
    }

    pub(crate) fn trigger(&self) -> &ShutdownTrigger {
        &self.inner.trigger
    }

    pub(crate) fn orchestrator(&self) -> &ShutdownOrchestrator {
        &self.inner.orchestrator
    }

    /// Start listening for termination signals, if enabled.
    pub(crate) fn spawn_signal_task(&self) -> std::io::Result<Option<JoinHandle<()>>> {
        if !self.is_enabled() || !self.inner.trap_signals {
            return Ok(None);
        }
        spawn_signal_task(self.inner.orchestrator.clone()).map(Some)
    }
}
