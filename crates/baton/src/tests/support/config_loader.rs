//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use serde_json::json;

use baton_config::{Config, WorkerSection};

use crate::bootstrap::ConfigLoader;

/// Loader returning a valid configuration for the `otlp/1` worker.
#[derive(Debug, Clone)]
pub struct TestConfigLoader {
    worker: WorkerSection,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let section = json!({ "otlp/1": { "endpoint": "collector:4317" } });
        Self {
            worker: serde_json::from_value(section).expect("worker section"),
        }
    }

    /// Loader whose worker table is empty.
    #[must_use]
    pub fn without_worker() -> Self {
        Self {
            worker: WorkerSection::default(),
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            worker: self.worker.clone(),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing a malformed CLI argument.
#[derive(Debug, Clone, Copy)]
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("baton"),
            OsString::from("--lease-duration-ms"),
            OsString::from("not-a-number"),
        ];
        Config::load_from_iter(args)
    }
}
