//! HTTP server driven by the lifecycle coordinator.
//!
//! # Responsibilities
//! - Attach probes and the request context layer to the host router
//! - Mark the service ready once the listener is accepting
//! - Stop accepting on shutdown and drain through the orchestrator
//! - Finish the lifecycle even if the server stops on its own

use std::future::IntoFuture;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::lifecycle::{LifecycleError, ShutdownReason};
use crate::Coordinator;

/// Server failure, as opposed to a lifecycle outcome.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for a host router.
pub struct LifecycleServer {
    coordinator: Coordinator,
    router: Router,
}

impl LifecycleServer {
    pub fn new(coordinator: Coordinator, router: Router) -> Self {
        Self {
            coordinator,
            router,
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<Option<LifecycleError>, ServeError> {
        let addr = listener.local_addr()?;
        let coordinator = self.coordinator;
        let app = coordinator.attach(self.router);
        let trigger = coordinator.trigger().clone();

        if !coordinator.is_enabled() {
            tracing::info!(address = %addr, "HTTP server starting, lifecycle disabled");
            axum::serve(listener, app)
                .with_graceful_shutdown(trigger.triggered())
                .await?;
            tracing::info!("HTTP server stopped");
            return Ok(None);
        }

        let signals = coordinator.spawn_signal_task()?;

        let server = axum::serve(listener, app)
            .with_graceful_shutdown(trigger.triggered())
            .into_future();
        tokio::pin!(server);

        coordinator.mark_ready();
        tracing::info!(
            address = %addr,
            runtime = %coordinator.runtime(),
            "HTTP server accepting connections"
        );

        // Trigger first: a graceful stop that finishes in the same wake
        // is still a requested shutdown.
        let exited = tokio::select! {
            biased;
            _ = trigger.triggered() => None,
            result = &mut server => Some(result),
        };

        let orchestrator = coordinator.orchestrator();
        let (outcome, server_result) = match exited {
            Some(result) => {
                match &result {
                    Ok(()) if trigger.is_triggered() => {}
                    Ok(()) => tracing::warn!("HTTP server stopped without shutdown"),
                    Err(e) => tracing::error!(error = %e, "HTTP server failed"),
                }
                orchestrator.initiate(ShutdownReason::ServerExited);
                (orchestrator.complete(async {}).await, result)
            }
            None => {
                let mut server_result = Ok(());
                let outcome = orchestrator
                    .complete(async {
                        server_result = server.await;
                    })
                    .await;
                (outcome, server_result)
            }
        };

        if let Some(task) = signals {
            task.abort();
        }

        tracing::info!(clean = outcome.is_none(), "HTTP server stopped");
        server_result?;
        Ok(outcome)
    }
}
