//! The leadership-gated lifecycle manager.
//!
//! [`LifecycleManager`] subscribes to a [`LeadershipSource`] and keeps at
//! most one worker running, and only while this replica leads. Every
//! acquisition opens a new generation; a worker whose creation finishes after
//! its generation ended is stopped instead of adopted.

mod control;
mod state;
mod status;

use std::io;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use thiserror::Error;

use baton_config::{ConfigurationError, GateSettings};

use crate::cancel::CancellationToken;
use crate::health::{LifecycleReporter, StructuredLifecycleReporter};
use crate::leadership::{
    LeadershipClosed, LeadershipSender, LeadershipSource, Subscription, SubscriptionError,
};
use crate::worker::{OutputSinks, WorkerFactory};

use self::control::Parked;
use self::state::{ControlMessage, GateContext, Machine};
use self::status::StatusCell;

pub use self::status::{ManagerStatus, Phase, StopReason};

/// Errors returned by [`LifecycleManager::run`].
#[derive(Debug, Error)]
pub enum RunError {
    /// The lease parameters are invalid.
    #[error("invalid gate configuration: {source}")]
    Configuration {
        /// Validation failure.
        #[source]
        source: ConfigurationError,
    },
    /// The leadership source refused the subscription.
    #[error("failed to subscribe to leadership: {source}")]
    Subscription {
        /// Error reported by the source.
        #[source]
        source: SubscriptionError,
    },
    /// `run` was called while the manager was already running.
    #[error("lifecycle manager is already running")]
    AlreadyRunning,
    /// `run` was called after shutdown.
    #[error("lifecycle manager has shut down")]
    Terminated,
    /// The control thread could not be spawned.
    #[error("failed to spawn control thread: {source}")]
    Spawn {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Errors returned by [`LifecycleManager::shutdown`].
///
/// The manager is terminal even when shutdown reports an error.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The leadership subscription finished with an error.
    #[error("leadership subscription failed: {source}")]
    Subscription {
        /// Error reported by the source.
        #[source]
        source: SubscriptionError,
    },
    /// The control thread panicked; its worker was stopped on unwind.
    #[error("control thread panicked")]
    ControlPanicked,
}

enum Lifecycle<F: WorkerFactory> {
    Idle,
    Active(ActiveGate<F>),
    Terminated,
}

struct ActiveGate<F: WorkerFactory> {
    subscription: Subscription,
    closing: CancellationToken,
    inbox: Sender<ControlMessage<F>>,
    control: JoinHandle<Parked<F>>,
}

/// Starts and stops one worker as leadership comes and goes.
///
/// # Examples
///
/// ```rust,no_run
/// use baton::{ElectorBridge, LifecycleManager, ThreadWorker, WorkerError, WorkerFactory};
/// use baton::OutputSinks;
/// use baton_config::{GateSettings, LeaseParameters, WorkerSpec};
///
/// struct Exporter;
///
/// impl WorkerFactory for Exporter {
///     type Worker = ThreadWorker;
///     type Sink = ();
///
///     fn create(&self, spec: &WorkerSpec, _: &OutputSinks<()>) -> Result<ThreadWorker, WorkerError> {
///         ThreadWorker::spawn(spec.id().to_string(), |token| {
///             while !token.wait_timeout(std::time::Duration::from_secs(1)) {}
///         })
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let spec = WorkerSpec::new("otlp/1".parse()?, Default::default());
/// let bridge = ElectorBridge::new();
/// let notifier = bridge.notifier();
/// let manager = LifecycleManager::new(
///     GateSettings::new(spec, LeaseParameters::default()),
///     Exporter,
///     bridge,
/// );
/// manager.run()?;
/// assert!(notifier.acquired());
/// manager.shutdown()?;
/// # Ok(())
/// # }
/// ```
pub struct LifecycleManager<F: WorkerFactory, S> {
    settings: GateSettings,
    factory: Arc<F>,
    source: S,
    sinks: Arc<OutputSinks<F::Sink>>,
    reporter: Arc<dyn LifecycleReporter>,
    status: Arc<StatusCell>,
    lifecycle: Mutex<Lifecycle<F>>,
}

impl<F: WorkerFactory, S> std::fmt::Debug for LifecycleManager<F, S> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LifecycleManager")
            .field("settings", &self.settings)
            .field("status", &self.status.snapshot())
            .finish_non_exhaustive()
    }
}

impl<F: WorkerFactory, S> LifecycleManager<F, S> {
    /// Builds an idle manager with no sinks and the structured reporter.
    #[must_use]
    pub fn new(settings: GateSettings, factory: F, source: S) -> Self {
        Self {
            settings,
            factory: Arc::new(factory),
            source,
            sinks: Arc::new(OutputSinks::new()),
            reporter: Arc::new(StructuredLifecycleReporter::new()),
            status: Arc::new(StatusCell::default()),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Replaces the sinks handed to every worker.
    #[must_use]
    pub fn with_sinks(mut self, sinks: OutputSinks<F::Sink>) -> Self {
        self.sinks = Arc::new(sinks);
        self
    }

    /// Replaces the lifecycle reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn LifecycleReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Settings the manager was built with.
    #[must_use]
    pub const fn settings(&self) -> &GateSettings {
        &self.settings
    }

    /// Current status snapshot.
    #[must_use]
    pub fn status(&self) -> ManagerStatus {
        self.status.snapshot()
    }

    /// Stops the subscription and any worker, then enters the terminal state.
    ///
    /// Idempotent: later calls, including concurrent ones, return `Ok(())`
    /// once the first has finished.
    ///
    /// # Errors
    ///
    /// Returns a [`ShutdownError`] when the subscription or the control
    /// thread ended abnormally. The manager is terminal regardless.
    pub fn shutdown(&self) -> Result<(), ShutdownError> {
        let mut lifecycle = self.lock_lifecycle();
        match std::mem::replace(&mut *lifecycle, Lifecycle::Terminated) {
            Lifecycle::Terminated => Ok(()),
            Lifecycle::Idle => {
                self.reporter.shutdown_starting();
                self.status.terminate();
                self.reporter.shutdown_completed();
                Ok(())
            }
            Lifecycle::Active(gate) => {
                self.reporter.shutdown_starting();
                let outcome = wind_down(gate);
                self.status.terminate();
                self.reporter.shutdown_completed();
                outcome
            }
        }
    }

    fn lock_lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle<F>> {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F, S> LifecycleManager<F, S>
where
    F: WorkerFactory,
    S: LeadershipSource,
{
    /// Subscribes to leadership and starts the control thread.
    ///
    /// Returns once the subscription is established; no worker starts until
    /// leadership is acquired.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] when the lease parameters are invalid, the
    /// source refuses the subscription, the control thread cannot be
    /// spawned, or the manager is already running or shut down.
    pub fn run(&self) -> Result<(), RunError> {
        let mut lifecycle = self.lock_lifecycle();
        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Active(_) => return Err(RunError::AlreadyRunning),
            Lifecycle::Terminated => return Err(RunError::Terminated),
        }

        self.reporter
            .run_starting(&self.settings.spec, &self.settings.lease);
        match self.activate() {
            Ok(gate) => {
                *lifecycle = Lifecycle::Active(gate);
                self.reporter.run_succeeded(&self.settings.spec);
                Ok(())
            }
            Err(error) => {
                self.reporter.run_failed(&error);
                Err(error)
            }
        }
    }

    fn activate(&self) -> Result<ActiveGate<F>, RunError> {
        self.settings
            .lease
            .validate()
            .map_err(|source| RunError::Configuration { source })?;

        let (inbox, receiver) = mpsc::channel();
        let forward = inbox.clone();
        let events = LeadershipSender::new(move |event| {
            forward
                .send(ControlMessage::Leadership(event))
                .map_err(|_| LeadershipClosed)
        });
        let subscription = self
            .source
            .subscribe(&self.settings.lease, events, CancellationToken::new())
            .map_err(|source| RunError::Subscription { source })?;

        let closing = CancellationToken::new();
        let context = GateContext {
            spec: Arc::new(self.settings.spec.clone()),
            factory: Arc::clone(&self.factory),
            sinks: Arc::clone(&self.sinks),
            reporter: Arc::clone(&self.reporter),
            stop_deadline: self.settings.lease.stop_deadline(),
        };
        let machine = Machine::new(
            context,
            Arc::clone(&self.status),
            inbox.clone(),
            closing.clone(),
        );
        match control::spawn(machine, receiver) {
            Ok(control) => Ok(ActiveGate {
                subscription,
                closing,
                inbox,
                control,
            }),
            Err(source) => {
                // Nothing was started yet; the subscription result is moot.
                drop(subscription.join());
                Err(RunError::Spawn { source })
            }
        }
    }
}

impl<F: WorkerFactory, S> Drop for LifecycleManager<F, S> {
    fn drop(&mut self) {
        let active = matches!(*self.lock_lifecycle(), Lifecycle::Active(_));
        if !active {
            return;
        }
        if let Err(error) = self.shutdown() {
            tracing::warn!(
                target: "baton::manager",
                error = %error,
                "shutdown on drop reported an error"
            );
        }
    }
}

fn wind_down<F: WorkerFactory>(gate: ActiveGate<F>) -> Result<(), ShutdownError> {
    let ActiveGate {
        subscription,
        closing,
        inbox,
        control,
    } = gate;

    closing.cancel();
    let subscribed = subscription
        .join()
        .map_err(|source| ShutdownError::Subscription { source });

    // The control thread is gone if this fails; `join` reports why.
    drop(inbox.send(ControlMessage::Shutdown));
    drop(inbox);
    let parked = control.join();

    match parked {
        Ok((machine, receiver)) => {
            machine.shut_down(&receiver);
            drop(receiver);
            subscribed
        }
        Err(_) => Err(ShutdownError::ControlPanicked),
    }
}
