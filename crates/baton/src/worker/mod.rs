//! Worker contracts: output signals, sinks, factories and start/stop errors.
//!
//! The lifecycle manager never inspects a worker beyond these seams. A
//! [`WorkerFactory`] turns a [`WorkerSpec`] and the downstream
//! [`OutputSinks`] into a running [`Worker`]; the manager wraps the result in
//! a [`WorkerHandle`] and is the only party that ever stops it.

mod handle;
mod thread;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use baton_config::{WorkerId, WorkerSpec};

pub use handle::{StopFailure, StopFailureKind, WorkerHandle};
pub use thread::ThreadWorker;

/// Kinds of output a gated worker may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    /// Log records.
    Logs,
    /// Metric points.
    Metrics,
    /// Trace spans.
    Traces,
}

impl Signal {
    /// Every signal, in declaration order.
    pub const ALL: [Self; 3] = [Self::Logs, Self::Metrics, Self::Traces];
}

impl fmt::Display for Signal {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Logs => "logs",
            Self::Metrics => "metrics",
            Self::Traces => "traces",
        };
        formatter.write_str(label)
    }
}

/// Set of [`Signal`]s, e.g. the capabilities of an assembled gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalSet {
    logs: bool,
    metrics: bool,
    traces: bool,
}

impl SignalSet {
    /// Empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            logs: false,
            metrics: false,
            traces: false,
        }
    }

    /// Adds `signal` to the set.
    pub const fn insert(&mut self, signal: Signal) {
        match signal {
            Signal::Logs => self.logs = true,
            Signal::Metrics => self.metrics = true,
            Signal::Traces => self.traces = true,
        }
    }

    /// Returns a copy of the set with `signal` added.
    #[must_use]
    pub const fn with(mut self, signal: Signal) -> Self {
        self.insert(signal);
        self
    }

    /// Returns `true` when `signal` is in the set.
    #[must_use]
    pub const fn contains(&self, signal: Signal) -> bool {
        match signal {
            Signal::Logs => self.logs,
            Signal::Metrics => self.metrics,
            Signal::Traces => self.traces,
        }
    }

    /// Returns `true` when no signal is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.logs || self.metrics || self.traces)
    }

    /// Iterates the members in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        Signal::ALL
            .into_iter()
            .filter(move |signal| self.contains(*signal))
    }
}

impl FromIterator<Signal> for SignalSet {
    fn from_iter<I: IntoIterator<Item = Signal>>(iter: I) -> Self {
        let mut set = Self::empty();
        for signal in iter {
            set.insert(signal);
        }
        set
    }
}

/// Downstream consumers for each signal the worker may emit.
///
/// A worker only receives the sinks for signals some pipeline attached; the
/// rest stay `None`.
#[derive(Debug, Clone)]
pub struct OutputSinks<S> {
    logs: Option<S>,
    metrics: Option<S>,
    traces: Option<S>,
}

impl<S> Default for OutputSinks<S> {
    fn default() -> Self {
        Self {
            logs: None,
            metrics: None,
            traces: None,
        }
    }
}

impl<S> OutputSinks<S> {
    /// Builds an empty set of sinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sinks with `sink` attached for `signal`.
    #[must_use]
    pub fn with(mut self, signal: Signal, sink: S) -> Self {
        self.insert(signal, sink);
        self
    }

    /// Attaches `sink` for `signal`, returning the sink it replaced.
    pub fn insert(&mut self, signal: Signal, sink: S) -> Option<S> {
        self.slot_mut(signal).replace(sink)
    }

    /// Sink attached for `signal`, if any.
    #[must_use]
    pub const fn get(&self, signal: Signal) -> Option<&S> {
        match signal {
            Signal::Logs => self.logs.as_ref(),
            Signal::Metrics => self.metrics.as_ref(),
            Signal::Traces => self.traces.as_ref(),
        }
    }

    /// Signals that currently have a sink.
    #[must_use]
    pub fn capabilities(&self) -> SignalSet {
        Signal::ALL
            .into_iter()
            .filter(|signal| self.get(*signal).is_some())
            .collect()
    }

    const fn slot_mut(&mut self, signal: Signal) -> &mut Option<S> {
        match signal {
            Signal::Logs => &mut self.logs,
            Signal::Metrics => &mut self.metrics,
            Signal::Traces => &mut self.traces,
        }
    }
}

/// A running unit of work that can be asked to stop.
pub trait Worker: Send + 'static {
    /// Stops the worker, releasing its resources.
    ///
    /// `deadline` is advisory: callers enforce it independently and stop
    /// waiting once it elapses.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] when the worker cannot shut down cleanly.
    fn stop(&mut self, deadline: Duration) -> Result<(), WorkerError>;
}

/// Creates workers from their specification and downstream sinks.
pub trait WorkerFactory: Send + Sync + 'static {
    /// Worker type produced by this factory.
    type Worker: Worker;
    /// Downstream consumer handed to new workers.
    type Sink: Send + Sync + 'static;

    /// Creates and starts a worker.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] when the worker cannot be created or
    /// started.
    fn create(
        &self,
        spec: &WorkerSpec,
        sinks: &OutputSinks<Self::Sink>,
    ) -> Result<Self::Worker, WorkerError>;
}

/// Error reported by a worker or its factory.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct WorkerError {
    message: String,
    /// Optional source error reported by the worker implementation.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl WorkerError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// A worker failed to start for a given leadership generation.
#[derive(Debug, Error)]
#[error("worker {id} failed to start for generation {generation}: {source}")]
pub struct StartFailure {
    /// Identity of the worker.
    pub id: WorkerId,
    /// Generation the start belonged to.
    pub generation: u64,
    #[source]
    source: WorkerError,
}

impl StartFailure {
    /// Wraps a factory error.
    #[must_use]
    pub const fn new(id: WorkerId, generation: u64, source: WorkerError) -> Self {
        Self {
            id,
            generation,
            source,
        }
    }

    /// The underlying factory error.
    #[must_use]
    pub const fn cause(&self) -> &WorkerError {
        &self.source
    }
}
