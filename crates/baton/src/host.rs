//! Running a gate for the lifetime of the host process.

use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;

use crate::leadership::LeadershipSource;
use crate::manager::{LifecycleManager, RunError, ShutdownError};
use crate::worker::WorkerFactory;

const HOST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host");

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Returns a [`SignalError`] when the listener cannot be installed.
    fn wait(&self) -> Result<(), SignalError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Waits for SIGTERM, SIGINT, SIGQUIT or SIGHUP.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), SignalError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| SignalError::Install { source })?;
        if let Some(signal) = signals.forever().next() {
            tracing::info!(target: HOST_TARGET, signal, "shutdown signal received");
        }
        Ok(())
    }
}

/// Errors returned by [`serve`].
#[derive(Debug, Error)]
pub enum ServeError {
    /// The manager failed to start.
    #[error(transparent)]
    Run(#[from] RunError),
    /// Waiting for the shutdown signal failed.
    #[error(transparent)]
    Signal(#[from] SignalError),
    /// Shutdown reported an error.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Runs `manager` until `signal` fires, then shuts it down.
///
/// The manager is shut down even when waiting for the signal fails.
///
/// # Errors
///
/// Returns the first failure among running, waiting and shutting down.
pub fn serve<F, S>(
    manager: &LifecycleManager<F, S>,
    signal: &dyn ShutdownSignal,
) -> Result<(), ServeError>
where
    F: WorkerFactory,
    S: LeadershipSource,
{
    manager.run()?;
    let waited = signal.wait();
    let stopped = manager.shutdown();
    waited?;
    stopped?;
    Ok(())
}
