//! Leadership sources that misbehave on purpose.

use baton_config::LeaseParameters;

use crate::cancel::CancellationToken;
use crate::leadership::{LeadershipSender, LeadershipSource, Subscription, SubscriptionError};

/// Source whose subscription always fails.
#[derive(Debug, Clone)]
pub struct FailingSource {
    message: String,
}

impl FailingSource {
    #[must_use]
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_owned(),
        }
    }
}

impl LeadershipSource for FailingSource {
    fn subscribe(
        &self,
        lease: &LeaseParameters,
        _events: LeadershipSender,
        _cancel: CancellationToken,
    ) -> Result<Subscription, SubscriptionError> {
        Err(SubscriptionError::establish(lease, self.message.clone()))
    }
}
