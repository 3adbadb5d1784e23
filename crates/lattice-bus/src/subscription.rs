//! # Subscriptions
//!
//! A subscription owns the receiving end of its message queue. The bus
//! holds the sending end; removing the route closes the queue once the
//! messages already in it have been read.

use crate::{BusError, Message};
use std::fmt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Bus-wide unique subscription id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sid-{}", self.0)
    }
}

/// Receiving side of one subscription.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    subject: String,
    receiver: mpsc::Receiver<Message>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, subject: String, receiver: mpsc::Receiver<Message>) -> Self {
        Self {
            id,
            subject,
            receiver,
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Pattern this subscription was opened with.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Next message; `None` once unsubscribed and drained.
    pub async fn next(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Next message without waiting.
    ///
    /// - `Ok(Some(message))` - a message was queued
    /// - `Ok(None)` - nothing queued yet
    /// - `Err(BusError::SubscriptionClosed)` - unsubscribed and drained
    pub fn try_next(&mut self) -> Result<Option<Message>, BusError> {
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(BusError::SubscriptionClosed),
        }
    }
}
