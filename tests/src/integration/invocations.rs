//! # Invocation Tests
//!
//! Inbound dispatch through peer subscriptions and outbound signed calls to
//! actors on the same lattice.

#[cfg(test)]
mod tests {
    use crate::integration::harness::*;
    use lattice_bus::{BusError, LatticeBus};
    use lattice_crypto::{decode_token, invocation_hash};
    use lattice_types::{Invocation, InvocationResponse, Topics};
    use provider_runtime::{ProviderError, ProviderHandlers};
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    fn echo() -> ProviderHandlers {
        ProviderHandlers::new().on_invocation(|action| async move {
            let mut reply = format!("{}:{}:", action.from_actor, action.operation).into_bytes();
            reply.extend_from_slice(&action.msg);
            anyhow::Ok(reply)
        })
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    #[tokio::test]
    async fn test_linked_actor_round_trip() {
        let harness = ProviderTestHarness::start(echo()).await;
        harness.link_actor("A1").await;

        let actor = harness.actor();
        let call = invocation("A1", PROVIDER_KEY, "Echo.Say", b"hello");
        let response = harness.invoke(&actor, &call, WAIT).await.unwrap();

        assert_eq!(response.invocation_id, call.id);
        assert_eq!(response.msg, b"A1:Echo.Say:hello".to_vec());
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_each_actor_answered_by_its_own_worker() {
        let harness = ProviderTestHarness::start(echo()).await;
        harness.link_actor("A1").await;
        harness.link_actor("A2").await;
        assert_eq!(
            harness.runtime.serving_peers(),
            vec!["A1".to_string(), "A2".to_string()]
        );

        let actor = harness.actor();
        for origin in ["A1", "A2"] {
            let call = invocation(origin, PROVIDER_KEY, "Echo.Say", b"x");
            let response = harness.invoke(&actor, &call, WAIT).await.unwrap();
            assert_eq!(response.msg, format!("{origin}:Echo.Say:x").into_bytes());
        }
    }

    #[tokio::test]
    async fn test_unlinked_actor_gets_no_reply() {
        let harness = ProviderTestHarness::start(echo()).await;
        harness.link_actor("A1").await;

        let actor = harness.actor();
        let wait = Duration::from_millis(100);
        let call = invocation("A9", PROVIDER_KEY, "Echo.Say", b"sneaky");
        assert_eq!(
            harness.invoke(&actor, &call, wait).await,
            Err(BusError::Timeout(wait))
        );
    }

    #[tokio::test]
    async fn test_handler_failure_becomes_response_error() {
        let harness = ProviderTestHarness::start(
            ProviderHandlers::new()
                .on_invocation(|_| async { Err(anyhow::anyhow!("bucket missing")) }),
        )
        .await;
        harness.link_actor("A1").await;

        let actor = harness.actor();
        let call = invocation("A1", PROVIDER_KEY, "Store.Get", b"k");
        let response = harness.invoke(&actor, &call, WAIT).await.unwrap();
        assert_eq!(response.error.as_deref(), Some("bucket missing"));
        assert!(response.msg.is_empty());
    }

    #[tokio::test]
    async fn test_invocations_are_served_concurrently() {
        let harness = ProviderTestHarness::start(ProviderHandlers::new().on_invocation(
            |action| async move {
                sleep(Duration::from_millis(150)).await;
                anyhow::Ok(action.msg)
            },
        ))
        .await;
        harness.link_actor("A1").await;

        let began = Instant::now();
        let mut calls = Vec::new();
        for i in 0..4u8 {
            let actor = harness.actor();
            let topic = harness.runtime.topics().invocations.clone();
            let payload = lattice_wire::to_vec(&invocation("A1", PROVIDER_KEY, "Slow.Op", &[i]));
            calls.push(tokio::spawn(async move {
                actor.request(&topic, payload, WAIT).await
            }));
        }
        for call in calls {
            assert!(call.await.unwrap().is_ok());
        }
        assert!(began.elapsed() < Duration::from_millis(500));
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    #[tokio::test]
    async fn test_outbound_call_carries_verifiable_claims() {
        let harness = ProviderTestHarness::start(ProviderHandlers::new()).await;

        let actor = harness.actor();
        let mut inbox = actor
            .subscribe(&Topics::outbound(LATTICE_PREFIX, "A1"))
            .await
            .unwrap();
        let responder = tokio::spawn(async move {
            let message = inbox.next().await.unwrap();
            let invocation: Invocation = lattice_wire::from_slice(&message.payload).unwrap();
            let reply = InvocationResponse::success(invocation.id.clone(), b"stored".to_vec());
            actor
                .publish(&message.reply.unwrap(), lattice_wire::to_vec(&reply))
                .await
                .unwrap();
            invocation
        });

        let payload = harness
            .runtime
            .to_actor("A1", "Store.Put", b"value".to_vec())
            .await
            .unwrap();
        assert_eq!(payload, b"stored".to_vec());

        let invocation = responder.await.unwrap();
        assert_eq!(invocation.host_id, HOST_ID);
        assert_eq!(invocation.content_length, 5);

        let claims = decode_token(&invocation.encoded_claims).unwrap();
        assert_eq!(claims.iss, INVOCATION_ISSUER);
        assert_eq!(claims.sub, invocation.id);
        assert_eq!(claims.wascap.target_url, "wasmbus://A1/Store.Put");
        assert_eq!(
            claims.wascap.origin_url,
            format!("wasmbus://wasmcloud/test/default/{PROVIDER_KEY}")
        );
        assert_eq!(
            claims.wascap.hash,
            invocation_hash(
                &claims.wascap.origin_url,
                &claims.wascap.target_url,
                "Store.Put",
                b"value"
            )
        );
    }

    #[tokio::test]
    async fn test_outbound_error_surfaces_as_remote() {
        let harness = ProviderTestHarness::start(ProviderHandlers::new()).await;

        let actor = harness.actor();
        let mut inbox = actor
            .subscribe(&Topics::outbound(LATTICE_PREFIX, "A1"))
            .await
            .unwrap();
        tokio::spawn(async move {
            let message = inbox.next().await.unwrap();
            let reply = InvocationResponse::failure("ignored", "no such key");
            actor
                .publish(&message.reply.unwrap(), lattice_wire::to_vec(&reply))
                .await
                .unwrap();
        });

        let result = harness
            .runtime
            .to_actor("A1", "Store.Get", b"k".to_vec())
            .await;
        assert!(matches!(result, Err(ProviderError::Remote(e)) if e == "no such key"));
    }

    #[tokio::test]
    async fn test_outbound_without_actor_fails_fast() {
        let harness = ProviderTestHarness::start(ProviderHandlers::new()).await;
        let result = harness
            .runtime
            .to_actor("A404", "Store.Get", Vec::new())
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::Bus(BusError::NoResponders(_)))
        ));
    }
}
