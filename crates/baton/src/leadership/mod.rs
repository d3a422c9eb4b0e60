//! Leadership notifications and the sources that produce them.
//!
//! A [`LeadershipSource`] wraps an external election primitive. When
//! subscribed it delivers [`LeadershipEvent`]s through a
//! [`LeadershipSender`] until the supplied [`CancellationToken`] is
//! cancelled. The lifecycle manager is the only subscriber.

mod bridge;

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;

use thiserror::Error;

use baton_config::LeaseParameters;

use crate::cancel::CancellationToken;

pub use bridge::{ElectorBridge, LeadershipNotifier};

/// Leadership transition observed by this replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadershipEvent {
    /// This replica became leader.
    Acquired,
    /// This replica is no longer leader.
    Lost,
}

impl fmt::Display for LeadershipEvent {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Acquired => "acquired",
            Self::Lost => "lost",
        };
        formatter.write_str(label)
    }
}

/// The subscriber is no longer accepting leadership events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("leadership subscriber has closed")]
pub struct LeadershipClosed;

type Deliver = dyn Fn(LeadershipEvent) -> Result<(), LeadershipClosed> + Send + Sync;

/// Delivers leadership events to the subscriber.
#[derive(Clone)]
pub struct LeadershipSender {
    deliver: Arc<Deliver>,
}

impl fmt::Debug for LeadershipSender {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("LeadershipSender").finish_non_exhaustive()
    }
}

impl LeadershipSender {
    /// Builds a sender from a delivery function.
    #[must_use]
    pub fn new<D>(deliver: D) -> Self
    where
        D: Fn(LeadershipEvent) -> Result<(), LeadershipClosed> + Send + Sync + 'static,
    {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    /// Builds a sender that forwards into a channel.
    #[must_use]
    pub fn from_channel(sender: mpsc::Sender<LeadershipEvent>) -> Self {
        Self::new(move |event| sender.send(event).map_err(|_| LeadershipClosed))
    }

    /// Delivers `event`.
    ///
    /// # Errors
    ///
    /// Returns [`LeadershipClosed`] when the subscriber has gone away.
    pub fn send(&self, event: LeadershipEvent) -> Result<(), LeadershipClosed> {
        (self.deliver)(event)
    }
}

/// Errors raised while subscribing to or running a leadership source.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The source could not establish its subscription.
    #[error("failed to subscribe to leadership for lease {lease}: {message}")]
    Establish {
        /// Lease that was contested.
        lease: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    /// The source accepts one subscriber at a time.
    #[error("leadership source already has an active subscriber")]
    AlreadySubscribed,
    /// The source's background thread failed after subscribing.
    #[error("leadership source failed: {message}")]
    Failed {
        /// Human-readable failure description.
        message: String,
    },
    /// The source's background thread panicked.
    #[error("leadership source thread panicked")]
    ThreadPanic,
}

impl SubscriptionError {
    /// Builds an [`SubscriptionError::Establish`] error without a source.
    #[must_use]
    pub fn establish(lease: &LeaseParameters, message: impl Into<String>) -> Self {
        Self::Establish {
            lease: lease.name().to_owned(),
            message: message.into(),
            source: None,
        }
    }

    /// Builds an [`SubscriptionError::Establish`] error wrapping `source`.
    #[must_use]
    pub fn establish_with_source(
        lease: &LeaseParameters,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Establish {
            lease: lease.name().to_owned(),
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Source of leadership transitions for one lease.
///
/// Implementations must deliver events in the order they happen, must not
/// deliver after `cancel` is cancelled and the subscription joined, and
/// should alternate `Acquired` and `Lost` starting with `Acquired`.
pub trait LeadershipSource: Send + Sync {
    /// Starts delivering events for `lease` into `events`.
    ///
    /// # Errors
    ///
    /// Returns a [`SubscriptionError`] when the subscription cannot be
    /// established.
    fn subscribe(
        &self,
        lease: &LeaseParameters,
        events: LeadershipSender,
        cancel: CancellationToken,
    ) -> Result<Subscription, SubscriptionError>;
}

impl<T> LeadershipSource for Arc<T>
where
    T: LeadershipSource + ?Sized,
{
    fn subscribe(
        &self,
        lease: &LeaseParameters,
        events: LeadershipSender,
        cancel: CancellationToken,
    ) -> Result<Subscription, SubscriptionError> {
        (**self).subscribe(lease, events, cancel)
    }
}

/// Handle to an active leadership subscription.
///
/// Dropping the handle cancels the subscription without waiting for it.
#[derive(Debug)]
pub struct Subscription {
    cancel: CancellationToken,
    thread: Option<JoinHandle<Result<(), SubscriptionError>>>,
}

impl Subscription {
    /// Subscription without a background thread of its own.
    #[must_use]
    pub const fn detached(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            thread: None,
        }
    }

    /// Subscription driven by `thread`, which must exit once `cancel` is
    /// cancelled.
    #[must_use]
    pub const fn with_thread(
        cancel: CancellationToken,
        thread: JoinHandle<Result<(), SubscriptionError>>,
    ) -> Self {
        Self {
            cancel,
            thread: Some(thread),
        }
    }

    /// Requests that the source stop delivering events.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancels the subscription and waits for its thread to exit.
    ///
    /// # Errors
    ///
    /// Returns the error the source thread finished with, or
    /// [`SubscriptionError::ThreadPanic`] when it panicked.
    pub fn join(mut self) -> Result<(), SubscriptionError> {
        self.cancel();
        self.thread.take().map_or(Ok(()), |thread| {
            thread
                .join()
                .unwrap_or_else(|_| Err(SubscriptionError::ThreadPanic))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
