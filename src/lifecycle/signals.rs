//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGTERM and SIGINT (Ctrl-C off unix)
//! - Translate the first signal into a shutdown
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A repeated signal during shutdown is logged and ignored; it neither
//!   shortens nor re-arms the timeout

use std::io;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::{ShutdownOrchestrator, ShutdownReason};

/// Registered termination signal streams.
pub struct SignalListener {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
}

impl SignalListener {
    /// Register the handlers. Fails if the OS refuses the registration.
    pub fn new() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                terminate: signal(SignalKind::terminate())?,
                interrupt: signal(SignalKind::interrupt())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the next termination signal and return its name.
    pub async fn recv(&mut self) -> io::Result<&'static str> {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.terminate.recv() => Ok("SIGTERM"),
                _ = self.interrupt.recv() => Ok("SIGINT"),
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            Ok("CTRL_C")
        }
    }
}

/// Spawn a task that starts shutdown on the first signal and swallows the rest.
pub(crate) fn spawn_signal_task(
    orchestrator: Arc<ShutdownOrchestrator>,
) -> io::Result<JoinHandle<()>> {
    let mut listener = SignalListener::new()?;

    Ok(tokio::spawn(async move {
        loop {
            match listener.recv().await {
                Ok(signal) => {
                    if orchestrator.initiate(ShutdownReason::Signal(signal)) {
                        tracing::info!(signal, "Lifecycle: termination signal received");
                    } else {
                        tracing::warn!(
                            signal,
                            "Lifecycle: shutdown already in progress, ignoring signal"
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Lifecycle: signal listener failed");
                    return;
                }
            }
        }
    }))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    use crate::lifecycle::{LifecycleHooks, LifecycleState, ShutdownTrigger, StateMachine};
    use crate::net::ConnectionTracker;

    #[tokio::test]
    async fn repeated_sigterm_starts_shutdown_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let c = closes.clone();
        let machine = Arc::new(StateMachine::new(LifecycleHooks::new().on_close(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })));
        let trigger = ShutdownTrigger::new();
        let orchestrator = Arc::new(ShutdownOrchestrator::new(
            machine.clone(),
            ConnectionTracker::new(),
            trigger.clone(),
            Duration::from_secs(30),
        ));
        machine.mark_ready();

        let task = spawn_signal_task(orchestrator).unwrap();

        kill(Pid::this(), Signal::SIGTERM).unwrap();
        tokio::time::timeout(
            Duration::from_secs(2),
            machine.wait_for(LifecycleState::ShuttingDown),
        )
        .await
        .expect("first SIGTERM should begin shutdown");
        assert!(trigger.is_triggered());

        kill(Pid::this(), Signal::SIGTERM).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(machine.current_state(), LifecycleState::ShuttingDown);
        assert!(!task.is_finished());
        task.abort();
    }
}
