//! Worker backed by a dedicated OS thread.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::cancel::CancellationToken;

use super::{Worker, WorkerError};

/// Runs a body on its own thread until cancelled.
///
/// The body receives a [`CancellationToken`] and must return once the token
/// is cancelled. Stopping cancels the token and joins the thread.
#[derive(Debug)]
pub struct ThreadWorker {
    token: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl ThreadWorker {
    /// Spawns `body` on a thread called `name`.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] when the thread cannot be spawned.
    pub fn spawn<B>(name: impl Into<String>, body: B) -> Result<Self, WorkerError>
    where
        B: FnOnce(CancellationToken) + Send + 'static,
    {
        let token = CancellationToken::new();
        let worker_token = token.clone();
        let thread = thread::Builder::new()
            .name(name.into())
            .spawn(move || body(worker_token))
            .map_err(|error| WorkerError::with_source("failed to spawn worker thread", error))?;
        Ok(Self {
            token,
            thread: Some(thread),
        })
    }

    /// Returns `true` once the body has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Worker for ThreadWorker {
    fn stop(&mut self, _deadline: Duration) -> Result<(), WorkerError> {
        self.token.cancel();
        self.thread.take().map_or(Ok(()), |thread| {
            thread
                .join()
                .map_err(|_| WorkerError::new("worker thread panicked"))
        })
    }
}

impl Drop for ThreadWorker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
