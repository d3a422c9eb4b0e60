//! Ownership wrapper giving every started worker a bounded, idempotent stop.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use baton_config::WorkerId;

use super::{Worker, WorkerError};

/// Reason a bounded stop did not complete cleanly.
#[derive(Debug, Error)]
pub enum StopFailureKind {
    /// The worker reported an error while stopping.
    #[error("worker rejected stop: {0}")]
    Rejected(#[source] WorkerError),
    /// The worker did not finish stopping before the deadline.
    #[error("worker did not stop within {deadline:?}")]
    DeadlineExceeded {
        /// Deadline that elapsed.
        deadline: Duration,
    },
    /// The worker panicked while stopping.
    #[error("worker panicked while stopping")]
    Panicked,
    /// The helper thread enforcing the deadline could not be spawned.
    #[error("failed to spawn stop thread: {0}")]
    Spawn(#[source] io::Error),
}

/// A worker stop that failed or timed out.
///
/// The handle is considered stopped regardless; the manager never retries.
#[derive(Debug, Error)]
#[error("worker {id} (generation {generation}) failed to stop: {kind}")]
pub struct StopFailure {
    /// Identity of the worker.
    pub id: WorkerId,
    /// Generation the worker was started for.
    pub generation: u64,
    /// What went wrong.
    #[source]
    pub kind: StopFailureKind,
}

/// Owns a started worker together with the generation it belongs to.
///
/// [`WorkerHandle::stop`] is idempotent: the first call stops the worker and
/// later calls return `Ok(())` without touching it. A handle dropped while
/// its worker runs stops it within the deadline given to
/// [`WorkerHandle::new`].
pub struct WorkerHandle<W: Worker> {
    id: WorkerId,
    generation: u64,
    drop_deadline: Duration,
    worker: Option<W>,
}

impl<W: Worker> std::fmt::Debug for WorkerHandle<W> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("stopped", &self.worker.is_none())
            .finish()
    }
}

impl<W: Worker> WorkerHandle<W> {
    /// Takes ownership of a freshly started worker.
    ///
    /// `drop_deadline` bounds the stop issued if the handle is dropped
    /// before [`WorkerHandle::stop`] is called.
    #[must_use]
    pub const fn new(id: WorkerId, generation: u64, worker: W, drop_deadline: Duration) -> Self {
        Self {
            id,
            generation,
            drop_deadline,
            worker: Some(worker),
        }
    }

    /// Identity of the worker.
    #[must_use]
    pub const fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Generation the worker was started for.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` once [`WorkerHandle::stop`] has been called.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.worker.is_none()
    }

    /// Stops the worker, waiting at most `deadline`.
    ///
    /// The worker's own `stop` runs on a helper thread. When the deadline
    /// elapses first the helper is left to finish in the background and the
    /// call returns [`StopFailureKind::DeadlineExceeded`].
    ///
    /// # Errors
    ///
    /// Returns a [`StopFailure`] describing why the stop did not complete
    /// cleanly within the deadline.
    pub fn stop(&mut self, deadline: Duration) -> Result<(), StopFailure> {
        let Some(mut worker) = self.worker.take() else {
            return Ok(());
        };

        let (sender, receiver) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name(format!("baton-stop-{}", self.generation))
            .spawn(move || {
                let outcome = worker.stop(deadline);
                // The receiver is gone once the deadline has elapsed.
                drop(sender.send(outcome));
            });
        if let Err(error) = spawned {
            return Err(self.failure(StopFailureKind::Spawn(error)));
        }

        match receiver.recv_timeout(deadline) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(self.failure(StopFailureKind::Rejected(error))),
            Err(RecvTimeoutError::Timeout) => {
                Err(self.failure(StopFailureKind::DeadlineExceeded { deadline }))
            }
            Err(RecvTimeoutError::Disconnected) => Err(self.failure(StopFailureKind::Panicked)),
        }
    }

    fn failure(&self, kind: StopFailureKind) -> StopFailure {
        StopFailure {
            id: self.id.clone(),
            generation: self.generation,
            kind,
        }
    }
}

impl<W: Worker> Drop for WorkerHandle<W> {
    fn drop(&mut self) {
        if self.is_stopped() {
            return;
        }
        tracing::warn!(
            target: "baton::worker",
            worker = %self.id,
            generation = self.generation,
            "worker handle dropped while running; stopping worker"
        );
        if let Err(error) = self.stop(self.drop_deadline) {
            tracing::error!(
                target: "baton::worker",
                worker = %error.id,
                generation = error.generation,
                error = %error.kind,
                "worker stop on drop failed"
            );
        }
    }
}
