//! Sharing one gate between several signal pipelines.
//!
//! A host may wire the same gate configuration into its logs, metrics and
//! traces pipelines. Each pipeline asks [`SharedComponents`] for the
//! component under the same key and attaches its sink to the returned
//! [`GateAssembly`]; the host then builds a single manager from the
//! accumulated sinks.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use baton_config::GateSettings;

use crate::worker::{OutputSinks, Signal, SignalSet};

/// Registry handing out one shared component per key.
#[derive(Debug)]
pub struct SharedComponents<K, C> {
    components: Mutex<HashMap<K, Arc<C>>>,
}

impl<K, C> Default for SharedComponents<K, C> {
    fn default() -> Self {
        Self {
            components: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, C> SharedComponents<K, C> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the component for `key`, creating it with `create` when
    /// absent.
    pub fn get_or_add(&self, key: K, create: impl FnOnce() -> C) -> Arc<C> {
        let mut components = self.lock();
        Arc::clone(
            components
                .entry(key)
                .or_insert_with(|| Arc::new(create())),
        )
    }

    /// Returns the component for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<Arc<C>> {
        self.lock().get(key).map(Arc::clone)
    }

    /// Forgets the component for `key`. Holders keep their `Arc`.
    pub fn remove(&self, key: &K) -> Option<Arc<C>> {
        self.lock().remove(key)
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Arc<C>>> {
        self.components
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sinks collected for one gate across pipelines.
#[derive(Debug)]
pub struct GateAssembly<S> {
    settings: GateSettings,
    sinks: Mutex<OutputSinks<S>>,
}

impl<S> GateAssembly<S> {
    /// Starts an assembly with no sinks.
    #[must_use]
    pub fn new(settings: GateSettings) -> Self {
        Self {
            settings,
            sinks: Mutex::new(OutputSinks::new()),
        }
    }

    /// Settings shared by every pipeline.
    #[must_use]
    pub const fn settings(&self) -> &GateSettings {
        &self.settings
    }

    /// Attaches `sink` for `signal`, returning the sink it replaced.
    pub fn attach(&self, signal: Signal, sink: S) -> Option<S> {
        self.lock().insert(signal, sink)
    }

    /// Signals with an attached sink.
    #[must_use]
    pub fn capabilities(&self) -> SignalSet {
        self.lock().capabilities()
    }

    /// Hands the accumulated sinks over, leaving the assembly empty.
    #[must_use]
    pub fn take_sinks(&self) -> OutputSinks<S> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, OutputSinks<S>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
