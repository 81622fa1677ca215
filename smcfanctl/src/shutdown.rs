//! Shutdown signals for fan sessions
//!
//! Handlers are installed before a fan leaves automatic mode, so a signal
//! ends the session through the failsafe teardown instead of the default
//! kill action.

use anyhow::{Context, Result};
use std::future::Future;
use tracing::info;

/// Wait for Ctrl-C, SIGTERM or SIGHUP
///
/// The handlers are registered when this is called; the returned future
/// resolves on the first signal received after that.
#[cfg(unix)]
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt =
        signal(SignalKind::interrupt()).context("Failed to install Ctrl-C handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("Received Ctrl-C, restoring fans"),
            _ = terminate.recv() => info!("Received SIGTERM, restoring fans"),
            _ = hangup.recv() => info!("Received SIGHUP, restoring fans"),
        }
    })
}

/// Wait for Ctrl-C, Ctrl-Break or console close
#[cfg(windows)]
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::windows::{ctrl_break, ctrl_c, ctrl_close};

    let mut interrupt = ctrl_c().context("Failed to install Ctrl-C handler")?;
    let mut brk = ctrl_break().context("Failed to install Ctrl-Break handler")?;
    let mut close = ctrl_close().context("Failed to install console close handler")?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("Received Ctrl-C, restoring fans"),
            _ = brk.recv() => info!("Received Ctrl-Break, restoring fans"),
            _ = close.recv() => info!("Console closing, restoring fans"),
        }
    })
}
