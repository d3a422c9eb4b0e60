//! Election backend double handing out bridge-backed sources.

use std::sync::{Arc, Mutex};

use baton_config::LeaseParameters;

use crate::bootstrap::{AuthenticationError, ElectionBackend};
use crate::leadership::ElectorBridge;

#[derive(Debug, Default)]
struct Connections {
    holders: Vec<String>,
    leases: Vec<String>,
    reject: Option<String>,
}

/// Backend recording connections; each connection returns the same bridge.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    bridge: ElectorBridge,
    connections: Arc<Mutex<Connections>>,
}

impl RecordingBackend {
    /// Makes every connection fail with `message`.
    pub fn reject(&self, message: &str) {
        self.lock().reject = Some(message.to_owned());
    }

    /// Bridge handed to connected managers.
    #[must_use]
    pub fn bridge(&self) -> ElectorBridge {
        self.bridge.clone()
    }

    /// Holder identities presented on connection.
    #[must_use]
    pub fn holders(&self) -> Vec<String> {
        self.lock().holders.clone()
    }

    /// Lease names presented on connection.
    #[must_use]
    pub fn leases(&self) -> Vec<String> {
        self.lock().leases.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connections> {
        self.connections.lock().expect("backend mutex poisoned")
    }
}

impl ElectionBackend for RecordingBackend {
    type Source = ElectorBridge;

    fn connect(
        &self,
        lease: &LeaseParameters,
        holder: &str,
    ) -> Result<ElectorBridge, AuthenticationError> {
        let mut connections = self.lock();
        if let Some(message) = connections.reject.as_deref() {
            return Err(AuthenticationError::new(message));
        }
        connections.holders.push(holder.to_owned());
        connections.leases.push(lease.name().to_owned());
        Ok(self.bridge.clone())
    }
}
