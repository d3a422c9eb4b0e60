//! Structured health reporting for gate lifecycle events.

use std::sync::Arc;

use baton_config::{GateSettings, LeaseParameters, WorkerId, WorkerSpec};

use crate::bootstrap::BootstrapError;
use crate::leadership::LeadershipEvent;
use crate::manager::{Phase, RunError, StopReason};
use crate::worker::{StartFailure, StopFailure};

const TARGET: &str = "baton::health";

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, settings: &GateSettings);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before the manager subscribes to leadership.
    fn run_starting(&self, spec: &WorkerSpec, lease: &LeaseParameters);

    /// Invoked once the subscription and control loop are live.
    fn run_succeeded(&self, spec: &WorkerSpec);

    /// Invoked when the manager could not start running.
    fn run_failed(&self, error: &RunError);

    /// Invoked when leadership is acquired, with the new generation.
    fn leadership_acquired(&self, generation: u64);

    /// Invoked when leadership is lost.
    fn leadership_lost(&self, generation: u64);

    /// Invoked when an event arrives that does not alternate with the
    /// previous one. The event is ignored.
    fn leadership_out_of_order(&self, event: LeadershipEvent, phase: Phase);

    /// Invoked before the factory is asked for a worker.
    fn worker_starting(&self, id: &WorkerId, generation: u64);

    /// Invoked when a started worker becomes the running worker.
    fn worker_running(&self, id: &WorkerId, generation: u64);

    /// Invoked when the factory fails.
    fn worker_start_failed(&self, failure: &StartFailure);

    /// Invoked when a start finishes after its leadership ended.
    fn stale_worker_discarded(&self, id: &WorkerId, generation: u64, current: u64);

    /// Invoked before a worker is stopped.
    fn worker_stopping(&self, id: &WorkerId, generation: u64, reason: StopReason);

    /// Invoked after a worker stopped cleanly.
    fn worker_stopped(&self, id: &WorkerId, generation: u64);

    /// Invoked when a stop failed or exceeded its deadline.
    fn worker_stop_failed(&self, failure: &StopFailure);

    /// Invoked when shutdown stops waiting for an in-flight start.
    fn start_abandoned(&self, id: &WorkerId, generation: u64);

    /// Invoked when shutdown begins.
    fn shutdown_starting(&self);

    /// Invoked when the manager reaches its terminal state.
    fn shutdown_completed(&self);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, settings: &GateSettings) {
        (**self).bootstrap_succeeded(settings);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn run_starting(&self, spec: &WorkerSpec, lease: &LeaseParameters) {
        (**self).run_starting(spec, lease);
    }

    fn run_succeeded(&self, spec: &WorkerSpec) {
        (**self).run_succeeded(spec);
    }

    fn run_failed(&self, error: &RunError) {
        (**self).run_failed(error);
    }

    fn leadership_acquired(&self, generation: u64) {
        (**self).leadership_acquired(generation);
    }

    fn leadership_lost(&self, generation: u64) {
        (**self).leadership_lost(generation);
    }

    fn leadership_out_of_order(&self, event: LeadershipEvent, phase: Phase) {
        (**self).leadership_out_of_order(event, phase);
    }

    fn worker_starting(&self, id: &WorkerId, generation: u64) {
        (**self).worker_starting(id, generation);
    }

    fn worker_running(&self, id: &WorkerId, generation: u64) {
        (**self).worker_running(id, generation);
    }

    fn worker_start_failed(&self, failure: &StartFailure) {
        (**self).worker_start_failed(failure);
    }

    fn stale_worker_discarded(&self, id: &WorkerId, generation: u64, current: u64) {
        (**self).stale_worker_discarded(id, generation, current);
    }

    fn worker_stopping(&self, id: &WorkerId, generation: u64, reason: StopReason) {
        (**self).worker_stopping(id, generation, reason);
    }

    fn worker_stopped(&self, id: &WorkerId, generation: u64) {
        (**self).worker_stopped(id, generation);
    }

    fn worker_stop_failed(&self, failure: &StopFailure) {
        (**self).worker_stop_failed(failure);
    }

    fn start_abandoned(&self, id: &WorkerId, generation: u64) {
        (**self).start_abandoned(id, generation);
    }

    fn shutdown_starting(&self) {
        (**self).shutdown_starting();
    }

    fn shutdown_completed(&self) {
        (**self).shutdown_completed();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: TARGET,
            event = "bootstrap_starting",
            "starting gate bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, settings: &GateSettings) {
        tracing::info!(
            target: TARGET,
            event = "bootstrap_succeeded",
            worker = %settings.spec.id(),
            lease = settings.lease.name(),
            namespace = ?settings.lease.namespace(),
            "gate bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: TARGET,
            event = "bootstrap_failed",
            error = %error,
            "gate bootstrap failed"
        );
    }

    fn run_starting(&self, spec: &WorkerSpec, lease: &LeaseParameters) {
        tracing::info!(
            target: TARGET,
            event = "run_starting",
            worker = %spec.id(),
            lease = lease.name(),
            lease_duration = ?lease.lease_duration(),
            renew_deadline = ?lease.renew_deadline(),
            retry_period = ?lease.retry_period(),
            "subscribing to leadership"
        );
    }

    fn run_succeeded(&self, spec: &WorkerSpec) {
        tracing::info!(
            target: TARGET,
            event = "run_succeeded",
            worker = %spec.id(),
            "waiting for leadership"
        );
    }

    fn run_failed(&self, error: &RunError) {
        tracing::error!(
            target: TARGET,
            event = "run_failed",
            error = %error,
            "gate failed to start"
        );
    }

    fn leadership_acquired(&self, generation: u64) {
        tracing::info!(
            target: TARGET,
            event = "leadership_acquired",
            generation,
            "leadership acquired"
        );
    }

    fn leadership_lost(&self, generation: u64) {
        tracing::info!(
            target: TARGET,
            event = "leadership_lost",
            generation,
            "leadership lost"
        );
    }

    fn leadership_out_of_order(&self, event: LeadershipEvent, phase: Phase) {
        tracing::warn!(
            target: TARGET,
            event = "leadership_out_of_order",
            leadership = %event,
            phase = %phase,
            "ignoring leadership event that does not alternate"
        );
    }

    fn worker_starting(&self, id: &WorkerId, generation: u64) {
        tracing::info!(
            target: TARGET,
            event = "worker_starting",
            worker = %id,
            generation,
            "starting worker"
        );
    }

    fn worker_running(&self, id: &WorkerId, generation: u64) {
        tracing::info!(
            target: TARGET,
            event = "worker_running",
            worker = %id,
            generation,
            "worker running"
        );
    }

    fn worker_start_failed(&self, failure: &StartFailure) {
        tracing::error!(
            target: TARGET,
            event = "worker_start_failed",
            worker = %failure.id,
            generation = failure.generation,
            message = %failure.cause().message(),
            error = ?failure,
            "worker failed to start"
        );
    }

    fn stale_worker_discarded(&self, id: &WorkerId, generation: u64, current: u64) {
        tracing::warn!(
            target: TARGET,
            event = "stale_worker_discarded",
            worker = %id,
            generation,
            current,
            "worker started after its leadership ended"
        );
    }

    fn worker_stopping(&self, id: &WorkerId, generation: u64, reason: StopReason) {
        tracing::info!(
            target: TARGET,
            event = "worker_stopping",
            worker = %id,
            generation,
            reason = %reason,
            "stopping worker"
        );
    }

    fn worker_stopped(&self, id: &WorkerId, generation: u64) {
        tracing::info!(
            target: TARGET,
            event = "worker_stopped",
            worker = %id,
            generation,
            "worker stopped"
        );
    }

    fn worker_stop_failed(&self, failure: &StopFailure) {
        tracing::error!(
            target: TARGET,
            event = "worker_stop_failed",
            worker = %failure.id,
            generation = failure.generation,
            error = %failure.kind,
            "worker failed to stop"
        );
    }

    fn start_abandoned(&self, id: &WorkerId, generation: u64) {
        tracing::warn!(
            target: TARGET,
            event = "start_abandoned",
            worker = %id,
            generation,
            "shutdown stopped waiting for an in-flight start"
        );
    }

    fn shutdown_starting(&self) {
        tracing::info!(
            target: TARGET,
            event = "shutdown_starting",
            "shutting down gate"
        );
    }

    fn shutdown_completed(&self) {
        tracing::info!(
            target: TARGET,
            event = "shutdown_completed",
            "gate shut down"
        );
    }
}
