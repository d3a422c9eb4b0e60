//! Gate bootstrap: configuration, telemetry, identity and cluster access.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use baton_config::{Config, ConfigurationError, GateSettings, LeaseParameters};

use crate::health::{LifecycleReporter, StructuredLifecycleReporter};
use crate::leadership::LeadershipSource;
use crate::manager::LifecycleManager;
use crate::telemetry::{self, TelemetryError};
use crate::worker::WorkerFactory;

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the gate configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// The cluster could not be reached with the available credentials.
#[derive(Debug, Error)]
#[error("failed to authenticate with the cluster: {message}")]
pub struct AuthenticationError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AuthenticationError {
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

/// Provides leadership sources backed by a cluster election primitive.
pub trait ElectionBackend {
    /// Source handed to the lifecycle manager.
    type Source: LeadershipSource;

    /// Authenticates and returns a source contesting `lease` as `holder`.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthenticationError`] when the cluster cannot be
    /// reached with the available credentials.
    fn connect(
        &self,
        lease: &LeaseParameters,
        holder: &str,
    ) -> Result<Self::Source, AuthenticationError>;
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but is not usable.
    #[error("invalid configuration: {source}")]
    Invalid {
        /// Validation failure.
        #[source]
        source: ConfigurationError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The host name could not be read.
    #[error("failed to determine the lease holder identity: {source}")]
    Identity {
        /// Error reported by the OS.
        #[source]
        source: nix::Error,
    },
    /// The election backend rejected the connection.
    #[error("failed to connect the election backend: {source}")]
    Authentication {
        /// Error reported by the backend.
        #[source]
        source: AuthenticationError,
    },
}

/// Identity this replica presents when contesting the lease.
///
/// # Errors
///
/// Returns the OS error when the host name cannot be read.
pub fn holder_identity() -> Result<String, nix::Error> {
    let host = nix::unistd::gethostname()?;
    Ok(host.to_string_lossy().into_owned())
}

/// Bootstraps a gate from the process environment with the structured
/// reporter.
///
/// # Errors
///
/// See [`bootstrap_with`].
pub fn bootstrap<B, F>(
    backend: &B,
    factory: F,
) -> Result<LifecycleManager<F, B::Source>, BootstrapError>
where
    B: ElectionBackend,
    F: WorkerFactory,
{
    bootstrap_with(
        &SystemConfigLoader,
        Arc::new(StructuredLifecycleReporter::new()),
        backend,
        factory,
    )
}

/// Bootstraps a gate using the supplied collaborators.
///
/// The returned manager has not been run.
///
/// # Errors
///
/// Returns a [`BootstrapError`] naming the first step that failed.
pub fn bootstrap_with<B, F>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn LifecycleReporter>,
    backend: &B,
    factory: F,
) -> Result<LifecycleManager<F, B::Source>, BootstrapError>
where
    B: ElectionBackend,
    F: WorkerFactory,
{
    reporter.bootstrap_starting();
    match prepare(loader, backend) {
        Ok((settings, source)) => {
            reporter.bootstrap_succeeded(&settings);
            Ok(LifecycleManager::new(settings, factory, source).with_reporter(reporter))
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn prepare<B: ElectionBackend>(
    loader: &dyn ConfigLoader,
    backend: &B,
) -> Result<(GateSettings, B::Source), BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let settings = config
        .gate_settings()
        .map_err(|source| BootstrapError::Invalid { source })?;
    telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let holder = holder_identity().map_err(|source| BootstrapError::Identity { source })?;
    let source = backend
        .connect(&settings.lease, &holder)
        .map_err(|source| BootstrapError::Authentication { source })?;
    Ok((settings, source))
}
