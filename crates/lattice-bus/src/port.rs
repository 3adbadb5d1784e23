//! # Bus Port
//!
//! The interface the provider runtime depends on. A broker client or the
//! in-process [`crate::InMemoryLattice`] sits behind it.

use crate::{BusError, Message, Subscription, SubscriptionId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One connection to the lattice.
#[async_trait]
pub trait LatticeBus: Send + Sync {
    /// Publish without expecting a reply.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Publish with a reply subject attached.
    async fn publish_with_reply(
        &self,
        subject: &str,
        reply: &str,
        payload: Vec<u8>,
    ) -> Result<(), BusError>;

    /// Publish and wait for exactly one reply.
    ///
    /// Fails with [`BusError::NoResponders`] when nobody is subscribed and
    /// with [`BusError::Timeout`] when no reply arrives within `timeout`.
    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Message, BusError>;

    /// Open a subscription on a subject pattern.
    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError>;

    /// Stop routing new messages to a subscription. Messages already queued
    /// stay readable.
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), BusError>;

    /// Wait until every publish issued so far has been handed to the bus.
    async fn flush(&self) -> Result<(), BusError>;

    /// Unsubscribe everything and refuse further operations.
    async fn close(&self) -> Result<(), BusError>;
}

/// Opens connections from a broker URL.
#[async_trait]
pub trait BusConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Arc<dyn LatticeBus>, BusError>;
}
