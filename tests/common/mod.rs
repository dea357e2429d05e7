//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::{extract::Query, routing::get, Extension, Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use runtime_lifecycle::environment::EnvSource;
use runtime_lifecycle::health::StatusSnapshot;
use runtime_lifecycle::{Coordinator, LifecycleError, LifecycleStatus, ServeError};

/// In-memory environment so tests never depend on the host machine.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
    marker: Option<String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_marker(mut self, contents: &str) -> Self {
        self.marker = Some(contents.to_string());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn read_marker(&self, _path: &Path) -> std::io::Result<String> {
        self.marker
            .clone()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
    }
}

#[derive(Deserialize)]
struct SlowParams {
    ms: u64,
}

/// Host router used by the tests: `/`, `/status`, `/slow?ms=N`.
pub fn app() -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/status",
            get(|Extension(status): Extension<LifecycleStatus>| async move {
                Json::<StatusSnapshot>(status.snapshot())
            }),
        )
        .route(
            "/slow",
            get(|Query(p): Query<SlowParams>| async move {
                tokio::time::sleep(Duration::from_millis(p.ms)).await;
                "done"
            }),
        )
}

pub type ServeHandle = JoinHandle<Result<Option<LifecycleError>, ServeError>>;

/// Serve [`app`] on an ephemeral port and wait until the server is up.
pub async fn spawn_server(coordinator: &Coordinator) -> (SocketAddr, ServeHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.serve(listener, app()).await })
    };

    wait_until(|| coordinator.is_ready()).await;
    (addr, handle)
}

/// Poll `cond` every few milliseconds, panicking after two seconds.
pub async fn wait_until(cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}
