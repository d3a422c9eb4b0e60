//! Worker factory double that records creations and stops.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use baton_config::{WorkerId, WorkerSpec};

use crate::worker::{OutputSinks, SignalSet, Worker, WorkerError, WorkerFactory};

#[derive(Debug, Default)]
struct Ledger {
    held: bool,
    entered: usize,
    created: usize,
    live: usize,
    max_live: usize,
    stops: usize,
    failures: VecDeque<String>,
    stop_delay: Option<Duration>,
    created_ids: Vec<WorkerId>,
    capabilities: Vec<SignalSet>,
}

#[derive(Debug, Default)]
struct Shared {
    ledger: Mutex<Ledger>,
    released: Condvar,
}

/// Factory recording every interaction, with scriptable failures and a gate
/// that holds creations in flight.
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    shared: Arc<Shared>,
}

impl RecordingFactory {
    /// Blocks creations until [`RecordingFactory::release_starts`].
    pub fn hold_starts(&self) {
        self.ledger().held = true;
    }

    /// Lets held and future creations proceed.
    pub fn release_starts(&self) {
        self.ledger().held = false;
        self.shared.released.notify_all();
    }

    /// Makes the next creation fail with `message`.
    pub fn fail_next(&self, message: &str) {
        self.ledger().failures.push_back(message.to_owned());
    }

    /// Makes workers created from now on take `delay` to stop.
    pub fn slow_stops(&self, delay: Duration) {
        self.ledger().stop_delay = Some(delay);
    }

    /// Creations that reached the factory, including held and failed ones.
    #[must_use]
    pub fn entered(&self) -> usize {
        self.ledger().entered
    }

    /// Workers successfully created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.ledger().created
    }

    /// Workers created and not yet stopped.
    #[must_use]
    pub fn live(&self) -> usize {
        self.ledger().live
    }

    /// Highest number of simultaneously live workers.
    #[must_use]
    pub fn max_live(&self) -> usize {
        self.ledger().max_live
    }

    /// Completed worker stops.
    #[must_use]
    pub fn stops(&self) -> usize {
        self.ledger().stops
    }

    /// Identities passed to the factory.
    #[must_use]
    pub fn created_ids(&self) -> Vec<WorkerId> {
        self.ledger().created_ids.clone()
    }

    /// Sink capabilities seen by each creation.
    #[must_use]
    pub fn capabilities(&self) -> Vec<SignalSet> {
        self.ledger().capabilities.clone()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.shared.ledger.lock().expect("factory ledger poisoned")
    }
}

impl WorkerFactory for RecordingFactory {
    type Worker = RecordingWorker;
    type Sink = String;

    fn create(
        &self,
        spec: &WorkerSpec,
        sinks: &OutputSinks<String>,
    ) -> Result<RecordingWorker, WorkerError> {
        let mut entered = self.ledger();
        entered.entered += 1;
        entered.capabilities.push(sinks.capabilities());
        let mut ledger = self
            .shared
            .released
            .wait_while(entered, |held| held.held)
            .expect("factory ledger poisoned");

        if let Some(message) = ledger.failures.pop_front() {
            return Err(WorkerError::new(message));
        }
        ledger.created += 1;
        ledger.live += 1;
        ledger.max_live = ledger.max_live.max(ledger.live);
        ledger.created_ids.push(spec.id().clone());
        Ok(RecordingWorker {
            shared: Arc::clone(&self.shared),
            stop_delay: ledger.stop_delay,
        })
    }
}

/// Worker produced by [`RecordingFactory`].
#[derive(Debug)]
pub struct RecordingWorker {
    shared: Arc<Shared>,
    stop_delay: Option<Duration>,
}

impl Worker for RecordingWorker {
    fn stop(&mut self, _deadline: Duration) -> Result<(), WorkerError> {
        if let Some(delay) = self.stop_delay {
            thread::sleep(delay);
        }
        let mut ledger = self.shared.ledger.lock().expect("factory ledger poisoned");
        ledger.live = ledger.live.saturating_sub(1);
        ledger.stops += 1;
        Ok(())
    }
}
