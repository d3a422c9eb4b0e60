//! Configuration errors raised before the lifecycle manager subscribes.

use std::io;
use std::time::Duration;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::worker::WorkerIdParseError;

/// Malformed or missing worker and lease settings.
///
/// These are fatal at startup: a manager never subscribes to leadership
/// events while its settings are invalid.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The worker table was empty.
    #[error("no worker is configured; exactly one worker must be defined")]
    MissingWorker,
    /// The worker table defined more than one worker identity.
    #[error("only one worker can be defined, found {}: {}", ids.len(), ids.join(", "))]
    MultipleWorkers {
        /// Identities found in the worker table.
        ids: Vec<String>,
    },
    /// The worker identity could not be parsed.
    #[error("invalid worker identity '{id}': {source}")]
    InvalidWorkerId {
        /// Identity text as configured.
        id: String,
        /// Parse failure.
        #[source]
        source: WorkerIdParseError,
    },
    /// The worker parameters were not a table.
    #[error("parameters for worker '{id}' must be a table")]
    InvalidParameters {
        /// Identity of the offending worker.
        id: String,
    },
    /// The lease name was blank.
    #[error("lease name must not be empty")]
    EmptyLeaseName,
    /// The lease timings violate `retry_period < renew_deadline < lease_duration`.
    #[error(
        "lease timings must satisfy retry_period < renew_deadline < lease_duration \
         (got lease_duration={lease_duration:?}, renew_deadline={renew_deadline:?}, \
         retry_period={retry_period:?})"
    )]
    LeaseTiming {
        /// Configured lease duration.
        lease_duration: Duration,
        /// Configured renew deadline.
        renew_deadline: Duration,
        /// Configured retry period.
        retry_period: Duration,
    },
    /// No namespace was configured and the process is not running in-cluster.
    #[error("no lease namespace configured and not running in-cluster ('{path}' is missing)")]
    NotInCluster {
        /// Namespace file that was probed.
        path: Utf8PathBuf,
    },
    /// The in-cluster namespace file exists but could not be read.
    #[error("failed to read lease namespace from '{path}': {source}")]
    NamespaceUnreadable {
        /// Namespace file that was read.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The in-cluster namespace file was empty.
    #[error("namespace file '{path}' is empty")]
    EmptyNamespace {
        /// Namespace file that was read.
        path: Utf8PathBuf,
    },
}
