//! Push-style adapter for election libraries that report through callbacks.

use std::sync::{Arc, Mutex, PoisonError};

use baton_config::LeaseParameters;

use crate::cancel::CancellationToken;

use super::{
    LeadershipEvent, LeadershipSender, LeadershipSource, Subscription, SubscriptionError,
};

#[derive(Debug)]
struct Target {
    events: LeadershipSender,
    cancel: CancellationToken,
}

type Slot = Arc<Mutex<Option<Target>>>;

/// [`LeadershipSource`] fed by an election library's callbacks.
///
/// Hand a [`LeadershipNotifier`] to the library's "started leading" and
/// "stopped leading" hooks; the bridge forwards each call to whichever
/// manager is currently subscribed. Notifications made while nobody is
/// subscribed are dropped.
#[derive(Debug, Clone, Default)]
pub struct ElectorBridge {
    slot: Slot,
}

impl ElectorBridge {
    /// Creates a bridge with no subscriber.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a notifier for the election callbacks.
    #[must_use]
    pub fn notifier(&self) -> LeadershipNotifier {
        LeadershipNotifier {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl LeadershipSource for ElectorBridge {
    fn subscribe(
        &self,
        _lease: &LeaseParameters,
        events: LeadershipSender,
        cancel: CancellationToken,
    ) -> Result<Subscription, SubscriptionError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot
            .as_ref()
            .is_some_and(|target| !target.cancel.is_cancelled())
        {
            return Err(SubscriptionError::AlreadySubscribed);
        }
        *slot = Some(Target {
            events,
            cancel: cancel.clone(),
        });
        Ok(Subscription::detached(cancel))
    }
}

/// Callback side of an [`ElectorBridge`].
#[derive(Debug, Clone)]
pub struct LeadershipNotifier {
    slot: Slot,
}

impl LeadershipNotifier {
    /// Reports that this replica became leader.
    ///
    /// Returns `true` when a subscriber received the event.
    #[must_use]
    pub fn acquired(&self) -> bool {
        self.notify(LeadershipEvent::Acquired)
    }

    /// Reports that this replica stopped leading.
    ///
    /// Returns `true` when a subscriber received the event.
    #[must_use]
    pub fn lost(&self) -> bool {
        self.notify(LeadershipEvent::Lost)
    }

    /// Forwards `event` to the current subscriber.
    ///
    /// Returns `true` when a subscriber received the event.
    #[must_use]
    pub fn notify(&self, event: LeadershipEvent) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(target) = slot.as_ref() else {
            return false;
        };
        if target.cancel.is_cancelled() || target.events.send(event).is_err() {
            *slot = None;
            return false;
        }
        true
    }

    /// Returns `true` while a live subscriber is attached.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|target| !target.cancel.is_cancelled())
    }
}
