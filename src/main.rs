//! runtime-lifecycle demo service.
//!
//! Serves a small router under the lifecycle coordinator so probes,
//! readiness flips and graceful drain can be observed with curl.
//!
//! ```text
//!     /          hello
//!     /status    lifecycle snapshot seen by the request
//!     /slow?ms=N holds the request open for N milliseconds
//!     /live      kubernetes only
//!     /ready     kubernetes only
//! ```

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    extract::Query,
    routing::get,
    Extension, Json, Router,
};
use clap::Parser;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use runtime_lifecycle::config::validation::validate_config;
use runtime_lifecycle::config::{load_config, ConfigError, ServiceConfig};
use runtime_lifecycle::health::StatusSnapshot;
use runtime_lifecycle::lifecycle::BoxError;
use runtime_lifecycle::observability::{logging, metrics};
use runtime_lifecycle::{Coordinator, LifecycleStatus, RuntimeEnvironment};

#[derive(Parser)]
#[command(name = "runtime-lifecycle")]
#[command(about = "HTTP service with runtime-aware probes and graceful shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override server.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Override lifecycle.runtime
    #[arg(short, long)]
    runtime: Option<RuntimeEnvironment>,

    /// Override lifecycle.timeout_ms
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Enable the Prometheus exporter on this address
    #[arg(long)]
    metrics_address: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ServiceConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.server.bind_address = bind;
        }
        if let Some(runtime) = self.runtime {
            config.lifecycle.runtime = runtime;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.lifecycle.timeout_ms = timeout_ms;
        }
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = addr;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[derive(Deserialize)]
struct SlowParams {
    #[serde(default)]
    ms: u64,
}

async fn status(Extension(status): Extension<LifecycleStatus>) -> Json<StatusSnapshot> {
    Json(status.snapshot())
}

async fn slow(Query(params): Query<SlowParams>) -> String {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    format!("slept {}ms\n", params.ms)
}

fn app() -> Router {
    Router::new()
        .route("/", get(|| async { "runtime-lifecycle\n" }))
        .route("/status", get(status))
        .route("/slow", get(slow))
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("runtime-lifecycle v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let coordinator = Coordinator::builder(config.lifecycle.clone())
        .on_ready(|| tracing::info!("Service ready"))
        .on_close(|| tracing::info!("Service closing"))
        .on_error(|e| tracing::error!(error = %e, "Shutdown failed"))
        .on_shutdown(|e| tracing::info!(clean = e.is_none(), "Service shut down"))
        .closing(|| async {
            tracing::debug!("Flushing before exit");
            Ok::<_, BoxError>(())
        })
        .build()?;

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        runtime = %coordinator.runtime(),
        "Listening for connections"
    );

    match coordinator.serve(listener, app()).await? {
        None => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
        Some(e) => {
            tracing::error!(error = %e, "Shutdown did not complete cleanly");
            Err(e.into())
        }
    }
}
