//! User lifecycle hooks.
//!
//! The hook set is fixed: each event dispatches to at most one handler.
//!
//! | hook       | fired when                                   |
//! |------------|----------------------------------------------|
//! | `ready`    | `Starting → Ready`                           |
//! | `close`    | shutdown begins, before any drain work       |
//! | `closing`  | awaited during drain, raced against timeout  |
//! | `error`    | shutdown finished with an error              |
//! | `shutdown` | shutdown finished, with or without an error  |

use std::fmt;
use std::future::Future;

use futures_util::future::{self, BoxFuture, FutureExt};

use crate::lifecycle::LifecycleError;

/// Error type accepted from the `closing` hook.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type Callback = Box<dyn Fn() + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&LifecycleError) + Send + Sync>;
type ShutdownCallback = Box<dyn Fn(Option<&LifecycleError>) + Send + Sync>;
type ClosingHook = Box<dyn Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Optional handlers for each lifecycle event.
#[derive(Default)]
pub struct LifecycleHooks {
    ready: Option<Callback>,
    close: Option<Callback>,
    error: Option<ErrorCallback>,
    shutdown: Option<ShutdownCallback>,
    closing: Option<ClosingHook>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once when the service becomes ready.
    pub fn on_ready<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.ready = Some(Box::new(f));
        self
    }

    /// Called once, synchronously, when shutdown begins.
    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.close = Some(Box::new(f));
        self
    }

    /// Called when shutdown ends with a timeout or a cleanup failure.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&LifecycleError) + Send + Sync + 'static,
    {
        self.error = Some(Box::new(f));
        self
    }

    /// Called once when shutdown ends, with the error if there was one.
    pub fn on_shutdown<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&LifecycleError>) + Send + Sync + 'static,
    {
        self.shutdown = Some(Box::new(f));
        self
    }

    /// Async cleanup awaited during drain.
    pub fn closing<F, Fut, E>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.closing = Some(Box::new(move || f().map(|r| r.map_err(Into::into)).boxed()));
        self
    }

    pub(crate) fn fire_ready(&self) {
        if let Some(f) = &self.ready {
            f();
        }
    }

    pub(crate) fn fire_close(&self) {
        if let Some(f) = &self.close {
            f();
        }
    }

    pub(crate) fn fire_shutdown(&self, error: Option<&LifecycleError>) {
        if let (Some(f), Some(e)) = (&self.error, error) {
            f(e);
        }
        if let Some(f) = &self.shutdown {
            f(error);
        }
    }

    /// The cleanup future, or an already-completed one when no hook is set.
    pub(crate) fn run_closing(&self) -> BoxFuture<'static, Result<(), BoxError>> {
        match &self.closing {
            Some(f) => f(),
            None => future::ready(Ok(())).boxed(),
        }
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("ready", &self.ready.is_some())
            .field("close", &self.close.is_some())
            .field("error", &self.error.is_some())
            .field("shutdown", &self.shutdown.is_some())
            .field("closing", &self.closing.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn error_hook_only_sees_errors() {
        let errors = Arc::new(AtomicUsize::new(0));
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let (e, s) = (errors.clone(), shutdowns.clone());

        let hooks = LifecycleHooks::new()
            .on_error(move |_| {
                e.fetch_add(1, Ordering::SeqCst);
            })
            .on_shutdown(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            });

        hooks.fire_shutdown(None);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);

        hooks.fire_shutdown(Some(&LifecycleError::ShutdownTimeout {
            timeout: Duration::from_millis(10),
        }));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn closing_defaults_to_ok() {
        assert!(LifecycleHooks::new().run_closing().await.is_ok());
    }

    #[tokio::test]
    async fn closing_error_is_boxed() {
        let hooks = LifecycleHooks::new().closing(|| async { Err("db still busy") });
        let err = hooks.run_closing().await.unwrap_err();
        assert_eq!(err.to_string(), "db still busy");
    }
}
