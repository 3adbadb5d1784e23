//! Inbound invocation dispatch and outbound signed calls.

use super::ProviderRuntime;
use crate::errors::ProviderError;
use lattice_bus::Message;
use lattice_crypto::ClaimsSigner;
use lattice_types::{
    Entity, Invocation, InvocationResponse, ProviderAction, ProviderResponse, ProviderState, Topics,
};
use tracing::{debug, warn};
use uuid::Uuid;

impl ProviderRuntime {
    /// Serve one message from the invocation subject on behalf of `peer`.
    ///
    /// Every peer worker sees every invocation. Each reads just the origin;
    /// only the worker whose peer it names decodes the rest and answers.
    /// Rejected invocations get no reply.
    pub(crate) async fn handle_invocation(self, peer: String, message: Message) {
        let tagging = self.inner.config.entity_tagging;
        let origin = match lattice_wire::peek_origin(&message.payload, tagging) {
            Ok(origin) => origin,
            Err(e) => {
                if self.reports_for_peers(&peer) {
                    warn!(error = %e, "Dropping malformed invocation");
                } else {
                    debug!(actor = %peer, error = %e, "Dropping malformed invocation");
                }
                return;
            }
        };
        if origin.public_key() != peer {
            return;
        }

        let invocation: Invocation = match lattice_wire::from_slice_with(&message.payload, tagging)
        {
            Ok(invocation) => invocation,
            Err(e) => {
                warn!(actor = %peer, error = %e, "Dropping malformed invocation");
                return;
            }
        };

        if let Err(e) = self.authorize(&invocation) {
            warn!(invocation_id = %invocation.id, error = %e, "Rejecting invocation");
            return;
        }
        let Some(reply) = message.reply else {
            warn!(invocation_id = %invocation.id, "Invocation without reply subject");
            return;
        };

        debug!(
            invocation_id = %invocation.id,
            operation = %invocation.operation,
            actor = %peer,
            bytes = invocation.msg.len(),
            "Dispatching invocation"
        );
        let action = ProviderAction {
            operation: invocation.operation,
            msg: invocation.msg,
            from_actor: peer,
        };
        let response = match (self.inner.handlers.invocation)(action).await {
            Ok(msg) => ProviderResponse::ok(msg),
            Err(e) => ProviderResponse::error(format!("{e:#}")),
        };

        let response = response.into_invocation_response(invocation.id);
        self.reply(&reply, lattice_wire::to_vec_with(&response, tagging))
            .await;
    }

    /// Whether `peer`'s worker speaks for all of them. Payloads no worker
    /// can attribute are reported once, by the lowest serving peer.
    fn reports_for_peers(&self, peer: &str) -> bool {
        self.inner
            .workers
            .lock()
            .peers
            .keys()
            .min()
            .is_some_and(|first| first == peer)
    }

    /// The target must be this provider and the origin must be linked to it.
    pub fn authorize(&self, invocation: &Invocation) -> Result<(), ProviderError> {
        let provider_key = self.inner.host.provider_key.as_str();
        let target = invocation.target.public_key();
        if target != provider_key {
            return Err(ProviderError::Authorization(format!(
                "target key mismatch: {target} != {provider_key}"
            )));
        }

        let origin = invocation.origin.public_key();
        if !self.inner.registry.is_linked(origin, provider_key) {
            return Err(ProviderError::Authorization(format!(
                "unlinked origin: {origin}"
            )));
        }
        Ok(())
    }

    /// Signed request to `target`, answered by exactly one response.
    ///
    /// Transport, timeout and decode failures are returned as they are;
    /// nothing is retried.
    pub async fn call(
        &self,
        target: Entity,
        operation: &str,
        msg: Vec<u8>,
    ) -> Result<InvocationResponse, ProviderError> {
        let state = self.state();
        if !matches!(state, ProviderState::Linking | ProviderState::Running) {
            return Err(ProviderError::InvalidState(state));
        }

        let host = &self.inner.host;
        let call_id = Uuid::new_v4().to_string();
        let origin = Entity::provider(
            host.provider_key.clone(),
            host.link_name(),
            self.inner.config.contract_id.clone(),
        );
        let subject = Topics::outbound(&host.lattice_rpc_prefix, target.public_key());

        let mut invocation =
            Invocation::new(origin, target, operation, msg, call_id.clone()).with_host_id(&host.host_id);
        ClaimsSigner::from_host_data(host)?.sign(&mut invocation, &call_id)?;

        let tagging = self.inner.config.entity_tagging;
        let payload = lattice_wire::to_vec_with(&invocation, tagging);
        debug!(
            invocation_id = %call_id,
            subject = %subject,
            operation = %operation,
            "Sending invocation"
        );
        let reply = self
            .inner
            .bus
            .request(&subject, payload, host.rpc_timeout())
            .await?;
        Ok(lattice_wire::from_slice_with(&reply.payload, tagging)?)
    }

    /// Call `operation` on an actor and return its payload. A response
    /// carrying an error string becomes [`ProviderError::Remote`].
    pub async fn to_actor(
        &self,
        actor_id: &str,
        operation: &str,
        msg: Vec<u8>,
    ) -> Result<Vec<u8>, ProviderError> {
        let response = self.call(Entity::actor(actor_id), operation, msg).await?;
        match response.error {
            Some(error) => Err(ProviderError::Remote(error)),
            None => Ok(response.msg),
        }
    }
}
