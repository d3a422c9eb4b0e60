//! Shared configuration for the baton lifecycle manager.
//!
//! [`Config`] is loaded through `ortho_config`, layering (lowest to highest
//! precedence) built-in defaults, a TOML file located via `--config-path` or
//! `BATON_CONFIG_PATH`, `BATON_*` environment variables and command-line
//! flags. The loaded configuration is materialised into the two records the
//! lifecycle manager consumes, a [`WorkerSpec`] and a [`LeaseParameters`],
//! bundled as [`GateSettings`].
//!
//! ```toml
//! log_format = "compact"
//! lease_name = "otel-gate"
//! lease_duration_ms = 15000
//! renew_deadline_ms = 10000
//! retry_period_ms = 2000
//!
//! [worker."otlp/1".protocols]
//! grpc = {}
//! ```

mod defaults;
mod error;
mod lease;
mod logging;
mod worker;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LEASE_DURATION, DEFAULT_LEASE_NAME, DEFAULT_LOG_FILTER, DEFAULT_RENEW_DEADLINE,
    DEFAULT_RETRY_PERIOD, IN_CLUSTER_NAMESPACE_PATH, default_lease_duration_ms,
    default_lease_name_string, default_log_filter, default_log_filter_string, default_log_format,
    default_renew_deadline_ms, default_retry_period_ms,
};
pub use error::ConfigurationError;
pub use lease::LeaseParameters;
pub use logging::{LogFormat, LogFormatParseError};
pub use worker::{
    Parameters, WorkerId, WorkerIdParseError, WorkerSection, WorkerSectionParseError, WorkerSpec,
};

/// Layered configuration for a leadership-gated worker.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "BATON")]
pub struct Config {
    /// `tracing` filter expression, e.g. `info` or `baton=debug`.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Output format for structured logs.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Name of the lease resource contested by replicas.
    #[serde(default = "default_lease_name_string")]
    pub lease_name: String,
    /// Namespace holding the lease; resolved in-cluster when unset.
    #[serde(default)]
    pub lease_namespace: Option<String>,
    /// Lease validity without renewal, in milliseconds.
    #[serde(default = "default_lease_duration_ms")]
    pub lease_duration_ms: u64,
    /// Renewal retry budget of the leader, in milliseconds.
    #[serde(default = "default_renew_deadline_ms")]
    pub renew_deadline_ms: u64,
    /// Interval between election attempts, in milliseconds.
    #[serde(default = "default_retry_period_ms")]
    pub retry_period_ms: u64,
    /// Worker table holding exactly one worker identity.
    #[serde(default)]
    pub worker: WorkerSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            lease_name: default_lease_name_string(),
            lease_namespace: None,
            lease_duration_ms: default_lease_duration_ms(),
            renew_deadline_ms: default_renew_deadline_ms(),
            retry_period_ms: default_retry_period_ms(),
            worker: WorkerSection::default(),
        }
    }
}

impl Config {
    /// Configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Lease parameters as configured. Not yet validated.
    #[must_use]
    pub fn lease_parameters(&self) -> LeaseParameters {
        let lease = LeaseParameters::new(self.lease_name.clone()).with_timings(
            Duration::from_millis(self.lease_duration_ms),
            Duration::from_millis(self.renew_deadline_ms),
            Duration::from_millis(self.retry_period_ms),
        );
        match self.lease_namespace.as_deref() {
            Some(namespace) => lease.with_namespace(namespace),
            None => lease,
        }
    }

    /// Materialises the worker specification.
    ///
    /// # Errors
    ///
    /// See [`WorkerSection::to_spec`].
    pub fn worker_spec(&self) -> Result<WorkerSpec, ConfigurationError> {
        self.worker.to_spec()
    }

    /// Validates and returns everything a lifecycle manager needs.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found in the worker table or
    /// the lease parameters.
    pub fn gate_settings(&self) -> Result<GateSettings, ConfigurationError> {
        let spec = self.worker_spec()?;
        let lease = self.lease_parameters();
        lease.validate()?;
        Ok(GateSettings { spec, lease })
    }
}

/// Validated settings for one lifecycle manager.
#[derive(Debug, Clone, PartialEq)]
pub struct GateSettings {
    /// The gated worker.
    pub spec: WorkerSpec,
    /// The lease deciding which replica runs it.
    pub lease: LeaseParameters,
}

impl GateSettings {
    /// Bundles a worker specification with its lease.
    #[must_use]
    pub const fn new(spec: WorkerSpec, lease: LeaseParameters) -> Self {
        Self { spec, lease }
    }
}
