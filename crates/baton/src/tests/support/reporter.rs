//! Test double for [`LifecycleReporter`] that records structured events.

use std::sync::Mutex;

use baton_config::{GateSettings, LeaseParameters, WorkerId, WorkerSpec};

use crate::bootstrap::BootstrapError;
use crate::health::LifecycleReporter;
use crate::leadership::LeadershipEvent;
use crate::manager::{Phase, RunError, StopReason};
use crate::worker::{StartFailure, StopFailure};

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    RunStarting,
    RunSucceeded,
    RunFailed(String),
    LeadershipAcquired(u64),
    LeadershipLost(u64),
    OutOfOrder { event: LeadershipEvent, phase: Phase },
    WorkerStarting(u64),
    WorkerRunning(u64),
    WorkerStartFailed { generation: u64, message: String },
    StaleWorkerDiscarded { generation: u64, current: u64 },
    WorkerStopping { generation: u64, reason: StopReason },
    WorkerStopped(u64),
    WorkerStopFailed(u64),
    StartAbandoned(u64),
    ShutdownStarting,
    ShutdownCompleted,
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    /// Returns `true` when `event` was recorded.
    #[must_use]
    pub fn saw(&self, event: &LifecycleEvent) -> bool {
        self.events().contains(event)
    }

    /// Counts recorded events matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&LifecycleEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingReporter {
    fn bootstrap_starting(&self) {
        self.record(LifecycleEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _settings: &GateSettings) {
        self.record(LifecycleEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(LifecycleEvent::BootstrapFailed(error.to_string()));
    }

    fn run_starting(&self, _spec: &WorkerSpec, _lease: &LeaseParameters) {
        self.record(LifecycleEvent::RunStarting);
    }

    fn run_succeeded(&self, _spec: &WorkerSpec) {
        self.record(LifecycleEvent::RunSucceeded);
    }

    fn run_failed(&self, error: &RunError) {
        self.record(LifecycleEvent::RunFailed(error.to_string()));
    }

    fn leadership_acquired(&self, generation: u64) {
        self.record(LifecycleEvent::LeadershipAcquired(generation));
    }

    fn leadership_lost(&self, generation: u64) {
        self.record(LifecycleEvent::LeadershipLost(generation));
    }

    fn leadership_out_of_order(&self, event: LeadershipEvent, phase: Phase) {
        self.record(LifecycleEvent::OutOfOrder { event, phase });
    }

    fn worker_starting(&self, _id: &WorkerId, generation: u64) {
        self.record(LifecycleEvent::WorkerStarting(generation));
    }

    fn worker_running(&self, _id: &WorkerId, generation: u64) {
        self.record(LifecycleEvent::WorkerRunning(generation));
    }

    fn worker_start_failed(&self, failure: &StartFailure) {
        self.record(LifecycleEvent::WorkerStartFailed {
            generation: failure.generation,
            message: failure.cause().message().to_owned(),
        });
    }

    fn stale_worker_discarded(&self, _id: &WorkerId, generation: u64, current: u64) {
        self.record(LifecycleEvent::StaleWorkerDiscarded {
            generation,
            current,
        });
    }

    fn worker_stopping(&self, _id: &WorkerId, generation: u64, reason: StopReason) {
        self.record(LifecycleEvent::WorkerStopping { generation, reason });
    }

    fn worker_stopped(&self, _id: &WorkerId, generation: u64) {
        self.record(LifecycleEvent::WorkerStopped(generation));
    }

    fn worker_stop_failed(&self, failure: &StopFailure) {
        self.record(LifecycleEvent::WorkerStopFailed(failure.generation));
    }

    fn start_abandoned(&self, _id: &WorkerId, generation: u64) {
        self.record(LifecycleEvent::StartAbandoned(generation));
    }

    fn shutdown_starting(&self) {
        self.record(LifecycleEvent::ShutdownStarting);
    }

    fn shutdown_completed(&self) {
        self.record(LifecycleEvent::ShutdownCompleted);
    }
}
