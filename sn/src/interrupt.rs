//! Cooperative interruption of a run
//!
//! A [`CancellationToken`] is the single interrupt flag. The scheduler checks
//! it before every attempt and races every pause against it; an in-flight
//! request is allowed to finish.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Owns the run's cancellation token
#[derive(Debug, Clone, Default)]
pub struct InterruptController {
    token: CancellationToken,
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token to hand to the scheduler
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request that the run stop at its next check
    pub fn interrupt(&self) {
        debug!("InterruptController::interrupt: called");
        self.token.cancel();
    }

    pub fn is_interrupted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the token on SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere)
    ///
    /// The listener task ends when a signal arrives or the token is cancelled
    /// by someone else.
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                res = wait_for_shutdown_signal() => {
                    match res {
                        Ok(()) => info!("Shutdown signal received, stopping run"),
                        Err(e) => warn!(error = %e, "Failed to install signal handlers, stopping run"),
                    }
                    token.cancel();
                }
                _ = token.cancelled() => {
                    debug!("listen_for_signals: token cancelled elsewhere");
                }
            }
        })
    }
}

/// Sleep for `delay` unless the token is cancelled first
///
/// Returns `true` when the full delay elapsed.
pub async fn sleep_or_cancel(delay: Duration, token: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !token.is_cancelled();
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = token.cancelled() => false,
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
