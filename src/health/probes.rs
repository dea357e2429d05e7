//! Liveness and readiness probe handlers.
//!
//! # Responsibilities
//! - Answer `/live`: 200 until the terminal state, then 503
//! - Answer `/ready`: 200 only while `Ready`, otherwise 503
//!
//! # Design Decisions
//! - Handlers only read the shared status, no I/O
//! - Readiness flips in the same call that begins shutdown, so load
//!   balancers stop routing before connections are closed

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::config::LifecycleConfig;
use crate::health::LifecycleStatus;

/// Router serving the two probe paths from `config`.
pub fn probe_router(config: &LifecycleConfig, status: LifecycleStatus) -> Router {
    Router::new()
        .route(&config.liveness_endpoint, get(liveness))
        .route(&config.readiness_endpoint, get(readiness))
        .with_state(status)
}

pub async fn liveness(State(status): State<LifecycleStatus>) -> Response {
    probe_response(status.alive(), &status)
}

pub async fn readiness(State(status): State<LifecycleStatus>) -> Response {
    probe_response(status.ready(), &status)
}

fn probe_response(ok: bool, status: &LifecycleStatus) -> Response {
    let code = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status.snapshot())).into_response()
}
