//! BDD worlds: the collaborators and results each scenario step touches.

use std::cell::RefCell;
use std::sync::Arc;

use baton_config::{GateSettings, LeaseParameters, WorkerId, WorkerSpec};

use crate::bootstrap::{BootstrapError, ConfigLoader, bootstrap_with};
use crate::leadership::{ElectorBridge, LeadershipNotifier, LeadershipSource};
use crate::manager::{LifecycleManager, ManagerStatus, RunError, ShutdownError};
use crate::worker::{OutputSinks, Signal};

use super::backend::RecordingBackend;
use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::factory::RecordingFactory;
use super::reporter::RecordingReporter;
use super::source::FailingSource;
use super::wait_until;

type Manager = LifecycleManager<RecordingFactory, Arc<dyn LeadershipSource>>;

/// Scenario world for the lifecycle suite.
pub struct GateWorld {
    pub factory: RecordingFactory,
    pub reporter: Arc<RecordingReporter>,
    bridge: ElectorBridge,
    notifier: LeadershipNotifier,
    worker: WorkerId,
    lease: LeaseParameters,
    sinks: OutputSinks<String>,
    source_failure: Option<String>,
    manager: Option<Manager>,
    pub run_result: Option<Result<(), RunError>>,
    pub shutdown_results: Vec<Result<(), ShutdownError>>,
}

impl GateWorld {
    #[must_use]
    pub fn new() -> Self {
        let bridge = ElectorBridge::new();
        let notifier = bridge.notifier();
        Self {
            factory: RecordingFactory::default(),
            reporter: Arc::new(RecordingReporter::default()),
            bridge,
            notifier,
            worker: "otlp/1".parse().expect("valid worker id"),
            lease: LeaseParameters::default(),
            sinks: OutputSinks::new(),
            source_failure: None,
            manager: None,
            run_result: None,
            shutdown_results: Vec::new(),
        }
    }

    /// Gates `worker` in the manager built by the next step.
    pub fn use_worker(&mut self, worker: WorkerId) {
        self.worker = worker;
    }

    /// Uses `lease` for the manager built by the next step.
    pub fn use_lease(&mut self, lease: LeaseParameters) {
        self.lease = lease;
    }

    /// Attaches a sink for `signal`.
    pub fn attach_sink(&mut self, signal: Signal) {
        self.sinks.insert(signal, format!("{signal}-exporter"));
    }

    /// Makes the leadership subscription fail.
    pub fn fail_subscription(&mut self, message: &str) {
        self.source_failure = Some(message.to_owned());
    }

    /// Runs the manager, building it on first use.
    pub fn run(&mut self) {
        let result = self.manager().run();
        self.run_result = Some(result);
    }

    /// Shuts the manager down, recording the outcome.
    pub fn shutdown(&mut self) {
        let result = self.manager().shutdown();
        self.shutdown_results.push(result);
    }

    /// Delivers an acquisition and waits until it has been applied.
    pub fn acquire(&mut self) -> Result<(), String> {
        let before = self.status().generation;
        if !self.notifier.acquired() {
            return Err("no subscriber received the acquisition".to_owned());
        }
        self.wait_for("the acquisition to be applied", |status| {
            status.leading && status.generation > before
        })
    }

    /// Delivers a loss and waits until it has been applied.
    pub fn lose(&mut self) -> Result<(), String> {
        if !self.notifier.lost() {
            return Err("no subscriber received the loss".to_owned());
        }
        self.wait_for("the loss to be applied", |status| !status.leading)
    }

    /// Delivers a raw notification without waiting.
    #[must_use]
    pub fn notify(&self, acquired: bool) -> bool {
        if acquired {
            self.notifier.acquired()
        } else {
            self.notifier.lost()
        }
    }

    /// Current manager status.
    pub fn status(&mut self) -> ManagerStatus {
        self.manager().status()
    }

    /// Polls the manager status until `condition` holds.
    pub fn wait_for(
        &mut self,
        description: &str,
        condition: impl Fn(&ManagerStatus) -> bool,
    ) -> Result<(), String> {
        let manager = self.manager();
        wait_until(description, || condition(&manager.status()))
    }

    fn manager(&mut self) -> &Manager {
        let Self {
            factory,
            reporter,
            bridge,
            worker,
            lease,
            sinks,
            source_failure,
            manager,
            ..
        } = self;
        manager.get_or_insert_with(|| {
            let source: Arc<dyn LeadershipSource> = match source_failure.as_deref() {
                Some(message) => Arc::new(FailingSource::new(message)),
                None => Arc::new(bridge.clone()),
            };
            let spec = WorkerSpec::new(worker.clone(), Default::default());
            let settings = GateSettings::new(spec, lease.clone());
            LifecycleManager::new(settings, factory.clone(), source)
                .with_sinks(sinks.clone())
                .with_reporter(reporter.clone())
        })
    }
}

/// Fixture building a fresh lifecycle world.
#[must_use]
pub fn gate_world() -> RefCell<GateWorld> {
    RefCell::new(GateWorld::new())
}

/// Scenario world for the bootstrap suite.
pub struct BootstrapWorld {
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingReporter>,
    pub backend: RecordingBackend,
    manager: Option<LifecycleManager<RecordingFactory, ElectorBridge>>,
    error: Option<BootstrapError>,
}

impl BootstrapWorld {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::new()),
            reporter: Arc::new(RecordingReporter::default()),
            backend: RecordingBackend::default(),
            manager: None,
            error: None,
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
    }

    /// Installs a loader without a worker table.
    pub fn use_loader_without_worker(&mut self) {
        self.loader = Box::new(TestConfigLoader::without_worker());
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.manager.is_some() || self.error.is_some() {
            return;
        }
        match bootstrap_with(
            &*self.loader,
            self.reporter.clone(),
            &self.backend,
            RecordingFactory::default(),
        ) {
            Ok(manager) => self.manager = Some(manager),
            Err(error) => self.error = Some(error),
        }
    }

    /// Error produced by bootstrap, if any.
    #[must_use]
    pub fn error(&self) -> Option<&BootstrapError> {
        self.error.as_ref()
    }

    /// Manager produced by bootstrap, if any.
    #[must_use]
    pub fn manager(&self) -> Option<&LifecycleManager<RecordingFactory, ElectorBridge>> {
        self.manager.as_ref()
    }
}

/// Fixture building a fresh bootstrap world.
#[must_use]
pub fn bootstrap_world() -> RefCell<BootstrapWorld> {
    RefCell::new(BootstrapWorld::new())
}
