use std::time::Duration;

use crate::logging::LogFormat;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Name of the lease resource contested by replicas when none is configured.
pub const DEFAULT_LEASE_NAME: &str = "lock";

/// How long a lease stays valid without renewal.
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(15);

/// How long the leader keeps retrying renewal before giving up.
pub const DEFAULT_RENEW_DEADLINE: Duration = Duration::from_secs(10);

/// Interval between election attempts.
pub const DEFAULT_RETRY_PERIOD: Duration = Duration::from_secs(2);

/// Service-account file holding the namespace of the pod the process runs in.
pub const IN_CLUSTER_NAMESPACE_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Owned default lease name for serde.
#[must_use]
pub fn default_lease_name_string() -> String {
    DEFAULT_LEASE_NAME.to_owned()
}

/// Default lease duration in milliseconds.
#[must_use]
pub const fn default_lease_duration_ms() -> u64 {
    millis(DEFAULT_LEASE_DURATION)
}

/// Default renew deadline in milliseconds.
#[must_use]
pub const fn default_renew_deadline_ms() -> u64 {
    millis(DEFAULT_RENEW_DEADLINE)
}

/// Default retry period in milliseconds.
#[must_use]
pub const fn default_retry_period_ms() -> u64 {
    millis(DEFAULT_RETRY_PERIOD)
}

const fn millis(duration: Duration) -> u64 {
    duration.as_secs() * 1_000 + duration.subsec_millis() as u64
}
