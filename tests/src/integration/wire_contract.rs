//! # Wire Contract Tests
//!
//! Hosts differ in how they encode control messages and entities. These
//! tests drive a provider configured for each variant with payloads built
//! the way such a host builds them.

#[cfg(test)]
mod tests {
    use crate::integration::harness::*;
    use lattice_bus::LatticeBus;
    use lattice_types::{Invocation, InvocationResponse, Topics};
    use lattice_wire::EntityTagging;
    use provider_runtime::{ControlFormat, ProviderConfig, ProviderHandlers};

    fn echo() -> ProviderHandlers {
        ProviderHandlers::new().on_invocation(|action| async move { anyhow::Ok(action.msg) })
    }

    // =========================================================================
    // JSON CONTROL MESSAGES
    // =========================================================================

    #[tokio::test]
    async fn test_json_link_and_health_messages() {
        let config = ProviderConfig::new(CONTRACT_ID).with_control_format(ControlFormat::Json);
        let harness = ProviderTestHarness::start_with(
            host_data(),
            config,
            echo().with_health_message("json ok"),
        )
        .await;

        let raw_link = format!(
            r#"{{"source_id":"A1","target":"{PROVIDER_KEY}","name":"default","wit_namespace":"wasmcloud","wit_package":"test","interfaces":["echo"]}}"#
        );
        harness
            .host
            .publish(
                &harness.runtime.topics().linkdefs_put,
                raw_link.into_bytes(),
            )
            .await
            .unwrap();
        let runtime = harness.runtime.clone();
        assert!(eventually(|| runtime.is_linked("A1", PROVIDER_KEY)).await);
        assert_eq!(
            harness.runtime.target_links()["A1"].interfaces,
            vec!["echo".to_string()]
        );

        let reply = harness
            .host
            .request(&harness.runtime.topics().health, Vec::new(), WAIT)
            .await
            .unwrap();
        let health: serde_json::Value = serde_json::from_slice(&reply.payload).unwrap();
        assert_eq!(health["healthy"], serde_json::Value::Bool(true));
        assert_eq!(health["message"], "json ok");
    }

    #[tokio::test]
    async fn test_msgpack_link_rejected_by_json_provider() {
        let config = ProviderConfig::new(CONTRACT_ID).with_control_format(ControlFormat::Json);
        let harness = ProviderTestHarness::start_with(host_data(), config, echo()).await;

        let msgpack = ProviderConfig::new(CONTRACT_ID)
            .encode_link(&lattice_types::InterfaceLinkDefinition::new("A1", PROVIDER_KEY))
            .unwrap();
        harness
            .host
            .publish(&harness.runtime.topics().linkdefs_put, msgpack)
            .await
            .unwrap();

        // the malformed payload is dropped and the provider keeps answering
        assert!(harness.health().await.healthy);
        assert!(harness.runtime.target_links().is_empty());
    }

    // =========================================================================
    // IMPLICIT ENTITY TAGGING
    // =========================================================================

    #[tokio::test]
    async fn test_implicit_tagging_inbound_round_trip() {
        let config = ProviderConfig::new(CONTRACT_ID).with_entity_tagging(EntityTagging::Implicit);
        let harness = ProviderTestHarness::start_with(host_data(), config, echo()).await;
        harness.link_actor("A1").await;

        let actor = harness.actor();
        let call = invocation("A1", PROVIDER_KEY, "Echo.Say", b"untagged");
        let response = harness.invoke(&actor, &call, WAIT).await.unwrap();
        assert_eq!(response.msg, b"untagged".to_vec());
        assert_eq!(response.content_length, 8);
    }

    #[tokio::test]
    async fn test_implicit_tagging_outbound_call() {
        let config = ProviderConfig::new(CONTRACT_ID).with_entity_tagging(EntityTagging::Implicit);
        let harness = ProviderTestHarness::start_with(host_data(), config, echo()).await;

        let actor = harness.actor();
        let mut inbox = actor
            .subscribe(&Topics::outbound(LATTICE_PREFIX, "A1"))
            .await
            .unwrap();
        let responder = tokio::spawn(async move {
            let message = inbox.next().await.unwrap();
            let invocation: Invocation =
                lattice_wire::from_slice_with(&message.payload, EntityTagging::Implicit).unwrap();
            let reply = InvocationResponse::success(invocation.id.clone(), invocation.msg.clone());
            actor
                .publish(
                    &message.reply.unwrap(),
                    lattice_wire::to_vec_with(&reply, EntityTagging::Implicit),
                )
                .await
                .unwrap();
            invocation
        });

        let payload = harness
            .runtime
            .to_actor("A1", "Echo.Say", b"ping".to_vec())
            .await
            .unwrap();
        assert_eq!(payload, b"ping".to_vec());

        let invocation = responder.await.unwrap();
        assert_eq!(invocation.origin.public_key(), PROVIDER_KEY);
        assert_eq!(invocation.origin.contract_id(), CONTRACT_ID);
        assert_eq!(invocation.target.public_key(), "A1");
    }
}
