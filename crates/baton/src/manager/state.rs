//! Leadership-driven worker state machine.
//!
//! All transitions run on one thread, the control thread, in the order their
//! messages were queued. Worker creation runs on a short-lived start thread
//! per generation and reports back through the same queue, so a `Lost` that
//! arrives while a worker is being created is observed before the creation
//! completes.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, SendError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use baton_config::WorkerSpec;

use crate::cancel::CancellationToken;
use crate::health::LifecycleReporter;
use crate::leadership::LeadershipEvent;
use crate::worker::{OutputSinks, StartFailure, WorkerError, WorkerFactory, WorkerHandle};

use super::status::{ManagerStatus, Phase, StatusCell, StopReason};

type Handle<F> = WorkerHandle<<F as WorkerFactory>::Worker>;

/// Messages consumed by the control thread.
pub(crate) enum ControlMessage<F: WorkerFactory> {
    Leadership(LeadershipEvent),
    StartFinished {
        generation: u64,
        outcome: Result<Handle<F>, StartFailure>,
    },
    Shutdown,
}

/// Collaborators shared by the control thread and its start threads.
pub(crate) struct GateContext<F: WorkerFactory> {
    pub(crate) spec: Arc<WorkerSpec>,
    pub(crate) factory: Arc<F>,
    pub(crate) sinks: Arc<OutputSinks<F::Sink>>,
    pub(crate) reporter: Arc<dyn LifecycleReporter>,
    pub(crate) stop_deadline: Duration,
}

impl<F: WorkerFactory> Clone for GateContext<F> {
    fn clone(&self) -> Self {
        Self {
            spec: Arc::clone(&self.spec),
            factory: Arc::clone(&self.factory),
            sinks: Arc::clone(&self.sinks),
            reporter: Arc::clone(&self.reporter),
            stop_deadline: self.stop_deadline,
        }
    }
}

pub(crate) struct Machine<F: WorkerFactory> {
    context: GateContext<F>,
    status: Arc<StatusCell>,
    inbox: Sender<ControlMessage<F>>,
    closing: CancellationToken,
    phase: Phase,
    generation: u64,
    leading: bool,
    in_flight: Option<u64>,
    pending_stop: Option<u64>,
    worker: Option<Handle<F>>,
    stop_by: Option<Instant>,
}

impl<F: WorkerFactory> Machine<F> {
    pub(crate) fn new(
        context: GateContext<F>,
        status: Arc<StatusCell>,
        inbox: Sender<ControlMessage<F>>,
        closing: CancellationToken,
    ) -> Self {
        Self {
            context,
            status,
            inbox,
            closing,
            phase: Phase::Idle,
            generation: 0,
            leading: false,
            in_flight: None,
            pending_stop: None,
            worker: None,
            stop_by: None,
        }
    }

    pub(crate) const fn status(&self) -> ManagerStatus {
        ManagerStatus {
            phase: self.phase,
            generation: self.generation,
            leading: self.leading,
            terminated: false,
        }
    }

    /// Applies one message. Returns `false` once asked to shut down.
    pub(crate) fn handle(&mut self, message: ControlMessage<F>) -> bool {
        match message {
            ControlMessage::Leadership(event) => self.on_leadership(event),
            ControlMessage::StartFinished {
                generation,
                outcome,
            } => self.on_start_finished(generation, outcome),
            ControlMessage::Shutdown => return false,
        }
        true
    }

    fn on_leadership(&mut self, event: LeadershipEvent) {
        if self.closing.is_cancelled() {
            tracing::debug!(
                target: "baton::manager",
                leadership = %event,
                "dropping leadership event received while closing"
            );
            return;
        }
        match event {
            LeadershipEvent::Acquired => self.on_acquired(),
            LeadershipEvent::Lost => self.on_lost(),
        }
        self.publish();
    }

    fn on_acquired(&mut self) {
        if self.leading {
            self.reporter()
                .leadership_out_of_order(LeadershipEvent::Acquired, self.phase);
            return;
        }
        self.leading = true;
        self.generation += 1;
        self.reporter().leadership_acquired(self.generation);
        // While an older start is in flight its completion starts this
        // generation.
        if self.phase == Phase::Idle {
            self.begin_start();
        }
    }

    fn on_lost(&mut self) {
        if !self.leading {
            self.reporter()
                .leadership_out_of_order(LeadershipEvent::Lost, self.phase);
            return;
        }
        self.leading = false;
        self.reporter().leadership_lost(self.generation);
        match self.phase {
            Phase::Running => self.stop_running(StopReason::LeadershipLost),
            Phase::Starting => self.pending_stop = self.in_flight,
            Phase::Idle | Phase::Stopping => {}
        }
    }

    fn begin_start(&mut self) {
        let generation = self.generation;
        self.phase = Phase::Starting;
        self.in_flight = Some(generation);
        self.reporter()
            .worker_starting(self.context.spec.id(), generation);
        self.publish();

        let job = StartJob {
            context: self.context.clone(),
            inbox: self.inbox.clone(),
            generation,
        };
        let spawned = thread::Builder::new()
            .name(format!("baton-start-{generation}"))
            .spawn(move || job.run());
        if let Err(error) = spawned {
            let failure = StartFailure::new(
                self.context.spec.id().clone(),
                generation,
                WorkerError::with_source("failed to spawn start thread", error),
            );
            self.on_start_finished(generation, Err(failure));
        }
    }

    fn on_start_finished(&mut self, generation: u64, outcome: Result<Handle<F>, StartFailure>) {
        if self.in_flight != Some(generation) {
            if let Ok(mut handle) = outcome {
                let deadline = self.stop_deadline();
                stop_and_report(&self.context, &mut handle, StopReason::Stale, deadline);
            }
            return;
        }
        self.in_flight = None;
        let cancelled = self.pending_stop.take() == Some(generation);
        let stale = cancelled
            || self.closing.is_cancelled()
            || !self.leading
            || generation != self.generation;

        match outcome {
            Err(failure) => {
                self.reporter().worker_start_failed(&failure);
                self.phase = Phase::Idle;
            }
            Ok(mut handle) if stale => {
                self.reporter()
                    .stale_worker_discarded(handle.id(), generation, self.generation);
                self.phase = Phase::Stopping;
                self.publish();
                let deadline = self.stop_deadline();
                stop_and_report(&self.context, &mut handle, StopReason::Stale, deadline);
                self.phase = Phase::Idle;
            }
            Ok(handle) => {
                self.reporter().worker_running(handle.id(), generation);
                self.worker = Some(handle);
                self.phase = Phase::Running;
            }
        }

        let superseded = self.leading && generation != self.generation;
        if self.phase == Phase::Idle && superseded && !self.closing.is_cancelled() {
            self.begin_start();
        }
        self.publish();
    }

    fn stop_running(&mut self, reason: StopReason) {
        let Some(mut handle) = self.worker.take() else {
            self.phase = Phase::Idle;
            return;
        };
        self.phase = Phase::Stopping;
        self.publish();
        let deadline = self.stop_deadline();
        stop_and_report(&self.context, &mut handle, reason, deadline);
        self.phase = Phase::Idle;
    }

    /// Time a single stop may take. During shutdown every wait and stop
    /// shares one budget of `stop_deadline`.
    fn stop_deadline(&self) -> Duration {
        self.stop_by.map_or(self.context.stop_deadline, |stop_by| {
            stop_by.saturating_duration_since(Instant::now())
        })
    }

    /// Winds the machine down once the control loop has exited.
    ///
    /// Waits for an in-flight start, stopping the worker it produces, then
    /// stops the running worker. The wait and both stops fit within one stop
    /// deadline. Once the caller drops `inbox`, a start still in flight stops
    /// its own worker.
    pub(crate) fn shut_down(mut self, inbox: &Receiver<ControlMessage<F>>) {
        self.closing.cancel();
        self.leading = false;
        self.pending_stop = self.in_flight;
        self.publish();

        let deadline = Instant::now() + self.context.stop_deadline;
        self.stop_by = Some(deadline);
        while let Some(in_flight) = self.in_flight {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match inbox.recv_timeout(remaining) {
                Ok(ControlMessage::StartFinished {
                    generation,
                    outcome,
                }) => self.on_start_finished(generation, outcome),
                Ok(ControlMessage::Leadership(_) | ControlMessage::Shutdown) => {}
                Err(_) => {
                    self.reporter()
                        .start_abandoned(self.context.spec.id(), in_flight);
                    break;
                }
            }
        }

        self.stop_running(StopReason::Shutdown);
        self.publish();
    }

    fn reporter(&self) -> &dyn LifecycleReporter {
        self.context.reporter.as_ref()
    }

    fn publish(&self) {
        self.status.publish(self.status());
    }
}

struct StartJob<F: WorkerFactory> {
    context: GateContext<F>,
    inbox: Sender<ControlMessage<F>>,
    generation: u64,
}

impl<F: WorkerFactory> StartJob<F> {
    fn run(self) {
        let Self {
            context,
            inbox,
            generation,
        } = self;
        let id = context.spec.id().clone();
        let created = panic::catch_unwind(AssertUnwindSafe(|| {
            context.factory.create(&context.spec, &context.sinks)
        }));
        let outcome = match created {
            Ok(Ok(worker)) => Ok(WorkerHandle::new(
                id,
                generation,
                worker,
                context.stop_deadline,
            )),
            Ok(Err(error)) => Err(StartFailure::new(id, generation, error)),
            Err(_) => Err(StartFailure::new(
                id,
                generation,
                WorkerError::new("worker factory panicked"),
            )),
        };

        let message = ControlMessage::StartFinished {
            generation,
            outcome,
        };
        // The manager is gone; nobody else will stop this worker.
        if let Err(SendError(ControlMessage::StartFinished {
            outcome: Ok(mut handle),
            ..
        })) = inbox.send(message)
        {
            stop_and_report(
                &context,
                &mut handle,
                StopReason::Stale,
                context.stop_deadline,
            );
        }
    }
}

fn stop_and_report<F: WorkerFactory>(
    context: &GateContext<F>,
    handle: &mut Handle<F>,
    reason: StopReason,
    deadline: Duration,
) {
    let reporter = context.reporter.as_ref();
    reporter.worker_stopping(handle.id(), handle.generation(), reason);
    match handle.stop(deadline) {
        Ok(()) => reporter.worker_stopped(handle.id(), handle.generation()),
        Err(failure) => reporter.worker_stop_failed(&failure),
    }
}
