//! Observable manager state.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Where the gated worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// No worker exists and none is being created.
    #[default]
    Idle,
    /// The factory is creating a worker.
    Starting,
    /// A worker is running for the current generation.
    Running,
    /// A worker is being stopped.
    Stopping,
}

impl fmt::Display for Phase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        formatter.write_str(label)
    }
}

/// Why a worker is being stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// Leadership was lost while the worker ran.
    LeadershipLost,
    /// The worker finished starting after its leadership ended.
    Stale,
    /// The manager is shutting down.
    Shutdown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LeadershipLost => "leadership_lost",
            Self::Stale => "stale",
            Self::Shutdown => "shutdown",
        };
        formatter.write_str(label)
    }
}

/// Point-in-time snapshot of a lifecycle manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManagerStatus {
    /// Worker phase.
    pub phase: Phase,
    /// Leadership generation; incremented on every acquisition.
    pub generation: u64,
    /// Whether this replica currently holds leadership.
    pub leading: bool,
    /// Whether the manager has shut down.
    pub terminated: bool,
}

/// Status shared between the control thread and status readers.
#[derive(Debug, Default)]
pub(crate) struct StatusCell {
    inner: Mutex<ManagerStatus>,
}

impl StatusCell {
    pub(crate) fn snapshot(&self) -> ManagerStatus {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish(&self, status: ManagerStatus) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    pub(crate) fn terminate(&self) {
        let mut status = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        status.phase = Phase::Idle;
        status.leading = false;
        status.terminated = true;
    }
}
