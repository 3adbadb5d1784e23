//! # In-Memory Lattice
//!
//! A process-local broker. Every [`InMemoryConnection`] shares one subject
//! table, so several providers and test peers can talk to each other
//! exactly as they would through a real broker.

use crate::port::{BusConnector, LatticeBus};
use crate::subject::{matches, validate_pattern, validate_publish};
use crate::subscription::{Subscription, SubscriptionId};
use crate::{BusError, Message, DEFAULT_CHANNEL_CAPACITY, INBOX_PREFIX};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

/// Only `memory://` URLs name an in-process lattice.
const MEMORY_SCHEME: &str = "memory";

struct Route {
    client: u64,
    pattern: String,
    sender: mpsc::Sender<Message>,
}

struct LatticeState {
    routes: RwLock<HashMap<SubscriptionId, Route>>,
    next_sid: AtomicU64,
    next_client: AtomicU64,
    online: AtomicBool,
    published: AtomicU64,
    capacity: usize,
}

impl LatticeState {
    /// Hand `message` to every matching route. Returns the number of
    /// subscriptions that had the subject routed to them.
    fn deliver(&self, message: &Message) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let routes = self.routes.read();
        let mut delivered = 0;
        for (sid, route) in routes.iter() {
            if !matches(&route.pattern, &message.subject) {
                continue;
            }
            match route.sender.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    delivered += 1;
                    warn!(
                        subject = %message.subject,
                        sid = %sid,
                        "Message dropped (slow consumer)"
                    );
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    fn remove_client(&self, client: u64) {
        self.routes.write().retain(|_, route| route.client != client);
    }
}

/// Process-local broker shared by all of its connections.
#[derive(Clone)]
pub struct InMemoryLattice {
    state: Arc<LatticeState>,
}

impl InMemoryLattice {
    /// Empty lattice with the default per-subscription buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Empty lattice buffering `capacity` messages per subscription.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::new(LatticeState {
                routes: RwLock::new(HashMap::new()),
                next_sid: AtomicU64::new(1),
                next_client: AtomicU64::new(1),
                online: AtomicBool::new(true),
                published: AtomicU64::new(0),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Open a connection directly, without URL checks.
    #[must_use]
    pub fn connection(&self) -> InMemoryConnection {
        InMemoryConnection {
            state: self.state.clone(),
            client: self.state.next_client.fetch_add(1, Ordering::Relaxed),
            closed: AtomicBool::new(false),
        }
    }

    /// Take the lattice offline (new connects are refused) or back online.
    pub fn set_online(&self, online: bool) {
        self.state.online.store(online, Ordering::SeqCst);
    }

    /// Number of live subscriptions across all connections.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.state.routes.read().len()
    }

    /// Whether any live subscription matches `subject`.
    #[must_use]
    pub fn has_subscribers(&self, subject: &str) -> bool {
        self.state
            .routes
            .read()
            .values()
            .any(|route| matches(&route.pattern, subject))
    }

    /// Total publishes seen, replies included.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.state.published.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryLattice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusConnector for InMemoryLattice {
    async fn connect(&self, url: &str) -> Result<Arc<dyn LatticeBus>, BusError> {
        if !self.state.online.load(Ordering::SeqCst) {
            return Err(BusError::ConnectionRefused(url.to_string()));
        }
        let scheme = url.split_once("://").map(|(scheme, _)| scheme);
        if scheme != Some(MEMORY_SCHEME) {
            return Err(BusError::ConnectionRefused(format!("unsupported url {url}")));
        }

        let connection = self.connection();
        debug!(url = %url, client = connection.client, "Connected to in-memory lattice");
        Ok(Arc::new(connection))
    }
}

/// One client of an [`InMemoryLattice`].
pub struct InMemoryConnection {
    state: Arc<LatticeState>,
    client: u64,
    closed: AtomicBool,
}

impl InMemoryConnection {
    fn ensure_open(&self) -> Result<(), BusError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BusError::Closed)
        } else {
            Ok(())
        }
    }

    fn publish_message(&self, message: Message) -> Result<usize, BusError> {
        self.ensure_open()?;
        validate_publish(&message.subject)?;
        let delivered = self.state.deliver(&message);
        debug!(
            subject = %message.subject,
            receivers = delivered,
            bytes = message.payload.len(),
            "Message published"
        );
        Ok(delivered)
    }
}

#[async_trait]
impl LatticeBus for InMemoryConnection {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.publish_message(Message::new(subject, None, payload))
            .map(|_| ())
    }

    async fn publish_with_reply(
        &self,
        subject: &str,
        reply: &str,
        payload: Vec<u8>,
    ) -> Result<(), BusError> {
        self.publish_message(Message::new(subject, Some(reply.to_string()), payload))
            .map(|_| ())
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Message, BusError> {
        self.ensure_open()?;
        validate_publish(subject)?;

        let inbox = format!("{INBOX_PREFIX}.{}", Uuid::new_v4().simple());
        let mut replies = self.subscribe(&inbox).await?;
        let outcome = match self.publish_message(Message::new(subject, Some(inbox), payload)) {
            Ok(0) => Err(BusError::NoResponders(subject.to_string())),
            Ok(_) => match tokio::time::timeout(timeout, replies.next()).await {
                Ok(Some(reply)) => Ok(reply),
                Ok(None) => Err(BusError::Closed),
                Err(_) => Err(BusError::Timeout(timeout)),
            },
            Err(e) => Err(e),
        };

        self.state.routes.write().remove(&replies.id());
        outcome
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError> {
        self.ensure_open()?;
        validate_pattern(subject)?;

        let sid = SubscriptionId(self.state.next_sid.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.state.capacity);
        self.state.routes.write().insert(
            sid,
            Route {
                client: self.client,
                pattern: subject.to_string(),
                sender,
            },
        );
        debug!(subject = %subject, sid = %sid, "Subscribed");
        Ok(Subscription::new(sid, subject.to_string(), receiver))
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), BusError> {
        if self.state.routes.write().remove(&id).is_some() {
            debug!(sid = %id, "Unsubscribed");
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), BusError> {
        // delivery is synchronous, nothing is ever pending
        self.ensure_open()
    }

    async fn close(&self) -> Result<(), BusError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.remove_client(self.client);
            debug!(client = self.client, "Connection closed");
        }
        Ok(())
    }
}

impl Drop for InMemoryConnection {
    fn drop(&mut self) {
        self.state.remove_client(self.client);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_millis(500);

    #[tokio::test]
    async fn test_publish_subscribe() {
        let lattice = InMemoryLattice::new();
        let a = lattice.connection();
        let b = lattice.connection();

        let mut sub = b.subscribe("wasmbus.rpc.default.P1.>").await.unwrap();
        a.publish("wasmbus.rpc.default.P1.default.health", b"ping".to_vec())
            .await
            .unwrap();

        let message = timeout(WAIT, sub.next()).await.unwrap().unwrap();
        assert_eq!(message.subject, "wasmbus.rpc.default.P1.default.health");
        assert_eq!(message.payload, b"ping".to_vec());
        assert!(message.reply.is_none());
    }

    #[tokio::test]
    async fn test_request_reply() {
        let lattice = InMemoryLattice::new();
        let client = lattice.connection();
        let server = lattice.connection();

        let mut sub = server.subscribe("svc.echo").await.unwrap();
        let responder = tokio::spawn(async move {
            let message = sub.next().await.unwrap();
            let reply = message.reply.unwrap();
            server.publish(&reply, message.payload).await.unwrap();
            server
        });

        let reply = client
            .request("svc.echo", b"hello".to_vec(), WAIT)
            .await
            .unwrap();
        assert_eq!(reply.payload, b"hello".to_vec());
        let _server = responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_no_responders() {
        let lattice = InMemoryLattice::new();
        let client = lattice.connection();
        let result = client.request("svc.nobody", Vec::new(), WAIT).await;
        assert_eq!(result, Err(BusError::NoResponders("svc.nobody".to_string())));
        assert_eq!(lattice.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let lattice = InMemoryLattice::new();
        let client = lattice.connection();
        let silent = lattice.connection();
        let _sub = silent.subscribe("svc.silent").await.unwrap();

        let wait = Duration::from_millis(50);
        let result = client.request("svc.silent", Vec::new(), wait).await;
        assert_eq!(result, Err(BusError::Timeout(wait)));
    }

    #[tokio::test]
    async fn test_unsubscribe_keeps_queued_messages() {
        let lattice = InMemoryLattice::new();
        let conn = lattice.connection();
        let mut sub = conn.subscribe("drain.me").await.unwrap();

        conn.publish("drain.me", b"1".to_vec()).await.unwrap();
        conn.publish("drain.me", b"2".to_vec()).await.unwrap();
        conn.unsubscribe(sub.id()).await.unwrap();
        conn.publish("drain.me", b"3".to_vec()).await.unwrap();

        assert_eq!(sub.next().await.unwrap().payload, b"1".to_vec());
        assert_eq!(sub.next().await.unwrap().payload, b"2".to_vec());
        assert!(sub.next().await.is_none());
        assert_eq!(sub.try_next(), Err(BusError::SubscriptionClosed));
    }

    #[tokio::test]
    async fn test_close_refuses_operations() {
        let lattice = InMemoryLattice::new();
        let conn = lattice.connection();
        let mut sub = conn.subscribe("a.b").await.unwrap();

        conn.close().await.unwrap();
        assert!(sub.next().await.is_none());
        assert_eq!(conn.publish("a.b", Vec::new()).await, Err(BusError::Closed));
        assert_eq!(conn.flush().await, Err(BusError::Closed));
        assert!(conn.close().await.is_ok());
        assert_eq!(lattice.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_checks_url_and_availability() {
        let lattice = InMemoryLattice::new();
        assert!(lattice.connect("memory://local").await.is_ok());
        assert!(matches!(
            lattice.connect("http://nope").await,
            Err(BusError::ConnectionRefused(_))
        ));

        lattice.set_online(false);
        assert!(matches!(
            lattice.connect("memory://local").await,
            Err(BusError::ConnectionRefused(_))
        ));
    }

    #[tokio::test]
    async fn test_broker_urls_are_not_served_in_process() {
        let lattice = InMemoryLattice::new();
        for url in ["nats://192.0.2.1:4222", "tls://127.0.0.1:4222", ""] {
            assert!(matches!(
                lattice.connect(url).await,
                Err(BusError::ConnectionRefused(e)) if e.contains("unsupported")
            ));
        }
        assert_eq!(lattice.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_subjects_rejected() {
        let lattice = InMemoryLattice::new();
        let conn = lattice.connection();
        assert!(matches!(
            conn.publish("a.*", Vec::new()).await,
            Err(BusError::InvalidSubject(_))
        ));
        assert!(matches!(
            conn.subscribe("a..b").await,
            Err(BusError::InvalidSubject(_))
        ));
    }

    #[tokio::test]
    async fn test_dropped_connection_removes_routes() {
        let lattice = InMemoryLattice::new();
        {
            let conn = lattice.connection();
            let _sub = conn.subscribe("x.y").await.unwrap();
            assert!(lattice.has_subscribers("x.y"));
        }
        assert!(!lattice.has_subscribers("x.y"));
    }
}
