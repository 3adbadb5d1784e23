//! Control subjects: health, link put, link delete, shutdown.

use super::worker::Worker;
use super::ProviderRuntime;
use crate::errors::ProviderError;
use crate::registry::{LinkOutcome, LinkRole};
use lattice_bus::Message;
use lattice_types::{InterfaceLinkDefinition, ProviderState};
use tracing::{debug, error, info, warn};

impl ProviderRuntime {
    /// Always replies, healthy or not.
    pub(crate) async fn handle_health(self, message: Message) {
        let Some(reply) = message.reply else {
            warn!(subject = %message.subject, "Health check without reply subject");
            return;
        };

        let response = (self.inner.handlers.health)();
        debug!(healthy = response.healthy, message = %response.message, "Health check");
        match self.inner.config.encode_health(&response) {
            Ok(payload) => self.reply(&reply, payload).await,
            Err(e) => error!(error = %e, "Failed to encode health response"),
        }
    }

    pub(crate) async fn handle_link_put(self, message: Message) {
        match self.inner.config.decode_link(&message.payload) {
            Ok(link) => self.apply_link_put(&link).await,
            Err(e) => warn!(error = %e, "Dropping malformed link definition"),
        }
    }

    pub(crate) async fn handle_link_del(self, message: Message) {
        match self.inner.config.decode_link(&message.payload) {
            Ok(link) => self.apply_link_del(&link).await,
            Err(e) => warn!(error = %e, "Dropping malformed link removal"),
        }
    }

    /// Hook, acknowledge, then drain. A shutdown already under way is only
    /// acknowledged.
    pub(crate) async fn handle_shutdown(self, message: Message) {
        info!("Shutdown requested by host");
        let began = self.begin_draining();
        if began {
            self.run_shutdown_hook();
        } else {
            debug!(state = %self.state(), "Shutdown already in progress");
        }
        if let Some(reply) = message.reply {
            self.reply(&reply, Vec::new()).await;
        }

        if began {
            // draining waits for this handler, so it must run elsewhere
            tokio::spawn(async move { self.finish_draining().await });
        }
    }

    /// Register `link`; a new inbound link gets its invocation subscription.
    pub(crate) async fn apply_link_put(&self, link: &InterfaceLinkDefinition) {
        match self.inner.registry.put(link) {
            Ok(LinkOutcome::Established(LinkRole::Target)) => {
                if let Err(e) = self.open_peer(&link.source_id).await {
                    error!(
                        actor = %link.source_id,
                        error = %e,
                        "Failed to subscribe for linked actor"
                    );
                }
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Link not established"),
        }
    }

    pub(crate) async fn apply_link_del(&self, link: &InterfaceLinkDefinition) {
        match self.inner.registry.delete(link) {
            Ok(LinkOutcome::Removed(LinkRole::Target)) => self.close_peer(&link.source_id).await,
            Ok(_) => {}
            Err(e) => error!(error = %e, "Link not removed"),
        }
    }

    /// Open the invocation subscription serving `peer`, once.
    pub(crate) async fn open_peer(&self, peer: &str) -> Result<(), ProviderError> {
        let state = self.state();
        if state >= ProviderState::Draining {
            return Err(ProviderError::InvalidState(state));
        }
        let already_open = self.inner.workers.lock().peers.contains_key(peer);
        if already_open {
            return Ok(());
        }

        let peer_key = peer.to_string();
        let worker = self
            .serve(
                format!("invocations:{peer}"),
                &self.inner.topics.invocations,
                move |runtime, message| runtime.handle_invocation(peer_key.clone(), message),
            )
            .await?;

        let raced: Option<Worker> = {
            let mut workers = self.inner.workers.lock();
            if workers.peers.contains_key(peer) {
                Some(worker)
            } else {
                workers.peers.insert(peer.to_string(), worker);
                None
            }
        };
        if let Some(worker) = raced {
            worker.drain(self.inner.bus.as_ref()).await;
        }
        Ok(())
    }

    /// Drain and forget the invocation subscription serving `peer`.
    pub(crate) async fn close_peer(&self, peer: &str) {
        let worker = self.inner.workers.lock().peers.remove(peer);
        if let Some(worker) = worker {
            debug!(actor = %peer, worker = %worker.name(), "Closing invocation subscription");
            worker.drain(self.inner.bus.as_ref()).await;
        }
    }
}
