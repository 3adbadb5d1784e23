//! Subscription workers.
//!
//! One task per subscription pulls messages and spawns one handler task per
//! message into a `JoinSet`, so handlers for the same subject run
//! concurrently. Draining unsubscribes at the bus, serves what is already
//! queued and then waits for every in-flight handler.

use lattice_bus::{LatticeBus, Message, Subscription, SubscriptionId};
use std::future::Future;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

pub(crate) struct Worker {
    name: String,
    sid: SubscriptionId,
    task: JoinHandle<()>,
}

impl Worker {
    /// Serve `subscription` with `handler` until it is drained.
    pub(crate) fn spawn<F, Fut>(
        name: impl Into<String>,
        mut subscription: Subscription,
        handler: F,
    ) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let sid = subscription.id();
        let subject = subscription.subject().to_string();
        let task_name = name.clone();

        let task = tokio::spawn(async move {
            let mut in_flight = JoinSet::new();
            loop {
                tokio::select! {
                    message = subscription.next() => match message {
                        Some(message) => {
                            in_flight.spawn(handler(message));
                        }
                        None => break,
                    },
                    Some(finished) = in_flight.join_next(), if !in_flight.is_empty() => {
                        if let Err(e) = finished {
                            warn!(worker = %task_name, error = %e, "Message handler failed");
                        }
                    }
                }
            }

            while let Some(finished) = in_flight.join_next().await {
                if let Err(e) = finished {
                    warn!(worker = %task_name, error = %e, "Message handler failed");
                }
            }
            debug!(worker = %task_name, "Worker stopped");
        });

        debug!(worker = %name, sid = %sid, subject = %subject, "Worker started");
        Self { name, sid, task }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Stop new deliveries, finish queued and in-flight messages.
    pub(crate) async fn drain(self, bus: &dyn LatticeBus) {
        if let Err(e) = bus.unsubscribe(self.sid).await {
            warn!(worker = %self.name, error = %e, "Unsubscribe failed during drain");
        }
        if let Err(e) = self.task.await {
            warn!(worker = %self.name, error = %e, "Worker task failed");
        }
        debug!(worker = %self.name, "Worker drained");
    }
}
