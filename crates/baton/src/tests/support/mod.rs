//! Test harness utilities shared by unit and behavioural suites.

mod backend;
mod config_loader;
mod factory;
mod reporter;
mod source;
mod world;

use std::thread;
use std::time::{Duration, Instant};

use baton_config::{GateSettings, LeaseParameters, WorkerSpec};

pub use backend::RecordingBackend;
pub use config_loader::TestConfigLoader;
pub use factory::RecordingFactory;
pub use reporter::{LifecycleEvent, RecordingReporter};
pub use source::FailingSource;
pub use world::{BootstrapWorld, GateWorld, bootstrap_world, gate_world};

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Settings for the `otlp/1` worker with the default lease.
#[must_use]
pub fn gate_settings() -> GateSettings {
    gate_settings_with(LeaseParameters::default())
}

/// Settings for the `otlp/1` worker with the supplied lease.
#[must_use]
pub fn gate_settings_with(lease: LeaseParameters) -> GateSettings {
    let id = "otlp/1".parse().expect("valid worker id");
    GateSettings::new(WorkerSpec::new(id, Default::default()), lease)
}

/// Polls `condition` until it holds or the wait times out.
pub fn wait_until(description: &str, condition: impl Fn() -> bool) -> Result<(), String> {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return Ok(());
        }
        thread::sleep(POLL_INTERVAL);
    }
    if condition() {
        Ok(())
    } else {
        Err(format!("timed out waiting for {description}"))
    }
}
