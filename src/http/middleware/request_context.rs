//! Request context middleware.
//! Counts in-flight requests and attaches the lifecycle status.
//!
//! Handlers read `Extension<LifecycleStatus>` and `Extension<RequestId>`.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::health::LifecycleStatus;
use crate::net::ConnectionTracker;

/// State shared by every request passing through the middleware.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub status: LifecycleStatus,
    pub tracker: ConnectionTracker,
}

pub async fn request_context_middleware(
    State(ctx): State<RequestContext>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let guard = ctx.tracker.track();

    req.extensions_mut().insert(ctx.status.clone());
    req.extensions_mut().insert(guard.id());

    let response = next.run(req).await;
    drop(guard);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    use crate::environment::RuntimeEnvironment;

    #[tokio::test]
    async fn attaches_status_and_counts() {
        let ctx = RequestContext {
            status: LifecycleStatus::disabled(),
            tracker: ConnectionTracker::new(),
        };
        let tracker = ctx.tracker.clone();

        let app = Router::new()
            .route(
                "/",
                get(move |Extension(status): Extension<LifecycleStatus>| {
                    let tracker = tracker.clone();
                    async move {
                        assert_eq!(tracker.active_count(), 1);
                        status.runtime().to_string()
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(
                ctx.clone(),
                request_context_middleware,
            ));

        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();

        assert_eq!(body, RuntimeEnvironment::None.as_str());
        assert_eq!(ctx.tracker.active_count(), 0);
    }
}
