//! Leadership-gated worker lifecycle for replicated collectors.
//!
//! Several replicas of a host run the same configuration, but some work, such
//! as scraping a cluster-wide endpoint, must happen on exactly one replica.
//! A [`LifecycleManager`] subscribes to a [`LeadershipSource`], starts the
//! gated worker through a [`WorkerFactory`] when this replica acquires the
//! lease, and stops it when leadership is lost or the host shuts down.
//!
//! Leadership acquisitions are numbered by generation. A worker whose start
//! finishes after its generation ended is stopped instead of adopted, so at
//! most one worker runs at a time and never outside a leadership interval
//! longer than the stop deadline.
//!
//! The [`bootstrap_with`] sequence loads layered configuration through
//! [`baton_config`], installs structured telemetry, resolves this replica's
//! lease holder identity and connects an [`ElectionBackend`]. Lifecycle
//! events are reported through a [`LifecycleReporter`], by default as
//! `tracing` events under the `baton::health` target.

mod bootstrap;
mod cancel;
mod health;
mod host;
mod leadership;
mod manager;
mod registry;
mod telemetry;
mod worker;

pub use bootstrap::{
    AuthenticationError, BootstrapError, ConfigLoader, ElectionBackend, StaticConfigLoader,
    SystemConfigLoader, bootstrap, bootstrap_with, holder_identity,
};
pub use cancel::CancellationToken;
pub use health::{LifecycleReporter, StructuredLifecycleReporter};
pub use host::{ServeError, ShutdownSignal, SignalError, SystemShutdownSignal, serve};
pub use leadership::{
    ElectorBridge, LeadershipClosed, LeadershipEvent, LeadershipNotifier, LeadershipSender,
    LeadershipSource, Subscription, SubscriptionError,
};
pub use manager::{
    LifecycleManager, ManagerStatus, Phase, RunError, ShutdownError, StopReason,
};
pub use registry::{GateAssembly, SharedComponents};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};
pub use worker::{
    OutputSinks, Signal, SignalSet, StartFailure, StopFailure, StopFailureKind, ThreadWorker,
    Worker, WorkerError, WorkerFactory, WorkerHandle,
};

#[cfg(test)]
mod tests;
