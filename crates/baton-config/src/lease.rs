//! Parameters of the distributed lease contested by replicas.

use std::fs;
use std::io;
use std::time::Duration;

use camino::Utf8Path;

use crate::defaults::{
    DEFAULT_LEASE_DURATION, DEFAULT_LEASE_NAME, DEFAULT_RENEW_DEADLINE, DEFAULT_RETRY_PERIOD,
    IN_CLUSTER_NAMESPACE_PATH,
};
use crate::error::ConfigurationError;

/// Identifies the lock resource and the timings handed to the elector.
///
/// The lifecycle manager does not interpret the timings beyond validating
/// them and deriving the worker stop deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseParameters {
    name: String,
    namespace: Option<String>,
    lease_duration: Duration,
    renew_deadline: Duration,
    retry_period: Duration,
}

impl Default for LeaseParameters {
    fn default() -> Self {
        Self::new(DEFAULT_LEASE_NAME)
    }
}

impl LeaseParameters {
    /// Builds parameters for the named lease with the default timings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            lease_duration: DEFAULT_LEASE_DURATION,
            renew_deadline: DEFAULT_RENEW_DEADLINE,
            retry_period: DEFAULT_RETRY_PERIOD,
        }
    }

    /// Pins the namespace holding the lease.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Overrides the election timings.
    #[must_use]
    pub fn with_timings(
        mut self,
        lease_duration: Duration,
        renew_deadline: Duration,
        retry_period: Duration,
    ) -> Self {
        self.lease_duration = lease_duration;
        self.renew_deadline = renew_deadline;
        self.retry_period = retry_period;
        self
    }

    /// Lease resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Configured namespace, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// How long a lease stays valid without renewal.
    #[must_use]
    pub const fn lease_duration(&self) -> Duration {
        self.lease_duration
    }

    /// How long the leader retries renewal before giving up.
    #[must_use]
    pub const fn renew_deadline(&self) -> Duration {
        self.renew_deadline
    }

    /// Interval between election attempts.
    #[must_use]
    pub const fn retry_period(&self) -> Duration {
        self.retry_period
    }

    /// Upper bound applied to every worker stop.
    ///
    /// A stop that outlives the renew deadline could leave the worker running
    /// after another replica has taken the lease.
    #[must_use]
    pub const fn stop_deadline(&self) -> Duration {
        self.renew_deadline
    }

    /// Checks the invariants required by the election primitive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyLeaseName`] for a blank name and
    /// [`ConfigurationError::LeaseTiming`] unless
    /// `0 < retry_period < renew_deadline < lease_duration`.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyLeaseName);
        }
        let ordered = !self.retry_period.is_zero()
            && self.retry_period < self.renew_deadline
            && self.renew_deadline < self.lease_duration;
        if ordered {
            Ok(())
        } else {
            Err(ConfigurationError::LeaseTiming {
                lease_duration: self.lease_duration,
                renew_deadline: self.renew_deadline,
                retry_period: self.retry_period,
            })
        }
    }

    /// Returns the configured namespace or the in-cluster one.
    ///
    /// # Errors
    ///
    /// See [`LeaseParameters::resolve_namespace_from`].
    pub fn resolve_namespace(&self) -> Result<String, ConfigurationError> {
        self.resolve_namespace_from(Utf8Path::new(IN_CLUSTER_NAMESPACE_PATH))
    }

    /// Returns the configured namespace, falling back to the contents of the
    /// service-account namespace file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NotInCluster`] when the file is absent,
    /// [`ConfigurationError::NamespaceUnreadable`] when it cannot be read and
    /// [`ConfigurationError::EmptyNamespace`] when it holds only whitespace.
    pub fn resolve_namespace_from(&self, path: &Utf8Path) -> Result<String, ConfigurationError> {
        if let Some(namespace) = self.namespace.as_deref()
            && !namespace.trim().is_empty()
        {
            return Ok(namespace.trim().to_owned());
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigurationError::NotInCluster {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(ConfigurationError::NamespaceUnreadable {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let namespace = contents.trim();
        if namespace.is_empty() {
            return Err(ConfigurationError::EmptyNamespace {
                path: path.to_path_buf(),
            });
        }
        Ok(namespace.to_owned())
    }
}
