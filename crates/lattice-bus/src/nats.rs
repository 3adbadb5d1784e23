//! # NATS Transport
//!
//! [`LatticeBus`] over a NATS broker, the transport hosts actually run.
//!
//! Each [`Subscription`] is fed by a forwarding task that copies messages
//! from the broker subscriber into the subscription's queue. Unsubscribing
//! stops the broker side first and then forwards whatever the client had
//! already buffered, so the drain semantics match the in-process lattice.

use crate::subject::{validate_pattern, validate_publish};
use crate::{
    BusConnector, BusError, LatticeBus, Message, Subscription, SubscriptionId,
    DEFAULT_CHANNEL_CAPACITY,
};
use async_nats::client::RequestErrorKind;
use async_nats::{AuthError, Client, ConnectOptions, Subscriber};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Broker used when host data names none.
pub const DEFAULT_LATTICE_URL: &str = "nats://127.0.0.1:4222";

const SUPPORTED_SCHEMES: [&str; 2] = ["nats", "tls"];

/// Signs the server nonce with the user's private key.
pub type NonceSigner = Arc<dyn Fn(&[u8]) -> Result<Vec<u8>, String> + Send + Sync>;

/// Connects to a NATS broker, optionally authenticating with a user JWT.
#[derive(Clone, Default)]
pub struct NatsConnector {
    credentials: Option<(String, NonceSigner)>,
}

impl NatsConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticate with `jwt`, answering the server challenge with `signer`.
    #[must_use]
    pub fn with_credentials(mut self, jwt: impl Into<String>, signer: NonceSigner) -> Self {
        self.credentials = Some((jwt.into(), signer));
        self
    }

    fn options(&self) -> ConnectOptions {
        match &self.credentials {
            Some((jwt, signer)) => {
                let signer = signer.clone();
                ConnectOptions::with_jwt(jwt.clone(), move |nonce: Vec<u8>| {
                    let signed = signer(&nonce).map_err(AuthError::new);
                    async move { signed }
                })
            }
            None => ConnectOptions::new(),
        }
    }
}

impl fmt::Debug for NatsConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NatsConnector")
            .field("authenticated", &self.credentials.is_some())
            .finish()
    }
}

#[async_trait]
impl BusConnector for NatsConnector {
    async fn connect(&self, url: &str) -> Result<Arc<dyn LatticeBus>, BusError> {
        let url = if url.is_empty() { DEFAULT_LATTICE_URL } else { url };
        let scheme = url.split_once("://").map(|(scheme, _)| scheme);
        if !scheme.is_some_and(|s| SUPPORTED_SCHEMES.contains(&s)) {
            return Err(BusError::ConnectionRefused(format!("unsupported url {url}")));
        }

        let client = self
            .options()
            .connect(url)
            .await
            .map_err(|e| BusError::ConnectionRefused(format!("{url}: {e}")))?;
        debug!(url = %url, "Connected to NATS");
        Ok(Arc::new(NatsConnection::new(client)))
    }
}

/// One client connection to a NATS broker.
pub struct NatsConnection {
    client: Mutex<Option<Client>>,
    /// Stop signals of live forwarding tasks, keyed by subscription id.
    forwarders: Mutex<HashMap<u64, oneshot::Sender<()>>>,
    next_sid: AtomicU64,
}

impl NatsConnection {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client: Mutex::new(Some(client)),
            forwarders: Mutex::new(HashMap::new()),
            next_sid: AtomicU64::new(1),
        }
    }

    fn client(&self) -> Result<Client, BusError> {
        self.client.lock().clone().ok_or(BusError::Closed)
    }
}

#[async_trait]
impl LatticeBus for NatsConnection {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        validate_publish(subject)?;
        self.client()?
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| BusError::Transport(e.to_string()))
    }

    async fn publish_with_reply(
        &self,
        subject: &str,
        reply: &str,
        payload: Vec<u8>,
    ) -> Result<(), BusError> {
        validate_publish(subject)?;
        validate_publish(reply)?;
        self.client()?
            .publish_with_reply(subject.to_string(), reply.to_string(), payload.into())
            .await
            .map_err(|e| BusError::Transport(e.to_string()))
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Message, BusError> {
        validate_publish(subject)?;
        let client = self.client()?;
        let reply = tokio::time::timeout(timeout, client.request(subject.to_string(), payload.into()))
            .await
            .map_err(|_| BusError::Timeout(timeout))?;
        match reply {
            Ok(message) => Ok(convert(message)),
            Err(e) => Err(match e.kind() {
                RequestErrorKind::NoResponders => BusError::NoResponders(subject.to_string()),
                RequestErrorKind::TimedOut => BusError::Timeout(timeout),
                RequestErrorKind::Other => BusError::Transport(e.to_string()),
            }),
        }
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError> {
        validate_pattern(subject)?;
        let subscriber = self
            .client()?
            .subscribe(subject.to_string())
            .await
            .map_err(|e| BusError::Transport(e.to_string()))?;

        let sid = self.next_sid.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let (stop, stopped) = oneshot::channel();
        self.forwarders.lock().insert(sid, stop);
        tokio::spawn(forward(sid, subscriber, sender, stopped));

        debug!(sid, subject = %subject, "Subscribed");
        Ok(Subscription::new(
            SubscriptionId(sid),
            subject.to_string(),
            receiver,
        ))
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), BusError> {
        if let Some(stop) = self.forwarders.lock().remove(&id.0) {
            // the task may already have ended with its subscriber
            let _ = stop.send(());
            debug!(sid = %id, "Unsubscribed");
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), BusError> {
        self.client()?.flush().await.map_err(|e| BusError::Transport(e.to_string()))
    }

    async fn close(&self) -> Result<(), BusError> {
        let Some(client) = self.client.lock().take() else {
            return Ok(());
        };
        if let Err(e) = client.flush().await {
            warn!(error = %e, "Flush failed while closing");
        }
        let forwarders: Vec<_> = self.forwarders.lock().drain().map(|(_, stop)| stop).collect();
        for stop in forwarders {
            let _ = stop.send(());
        }
        debug!("NATS connection closed");
        Ok(())
    }
}

/// Copy broker messages into the subscription queue until the broker side
/// is unsubscribed and its buffer is empty, or the subscription is dropped.
async fn forward(
    sid: u64,
    mut subscriber: Subscriber,
    sender: mpsc::Sender<Message>,
    mut stopped: oneshot::Receiver<()>,
) {
    let mut draining = false;
    loop {
        tokio::select! {
            _ = &mut stopped, if !draining => {
                draining = true;
                if let Err(e) = subscriber.unsubscribe().await {
                    warn!(sid, error = %e, "Broker unsubscribe failed");
                    return;
                }
            }
            next = subscriber.next() => match next {
                Some(message) => {
                    if sender.send(convert(message)).await.is_err() {
                        return;
                    }
                }
                None => return,
            },
        }
    }
}

fn convert(message: async_nats::Message) -> Message {
    Message::new(
        message.subject.to_string(),
        message.reply.map(|reply| reply.to_string()),
        message.payload.to_vec(),
    )
}
