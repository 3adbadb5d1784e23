//! # Provider Lifecycle Tests
//!
//! Bootstrap, link management, health and shutdown as the host drives them
//! over the lattice.

#[cfg(test)]
mod tests {
    use crate::integration::harness::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use lattice_bus::{BusError, InMemoryLattice, LatticeBus};
    use lattice_types::{HealthCheckResponse, InterfaceLinkDefinition, ProviderState};
    use provider_runtime::{
        lattice_connector, Bootstrapper, ProviderConfig, ProviderError, ProviderHandlers,
        ProviderRuntime,
    };
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    // =========================================================================
    // BOOTSTRAP
    // =========================================================================

    #[tokio::test]
    async fn test_bootstrap_from_base64_host_data() {
        let raw = format!(
            r#"{{"host_id":"{HOST_ID}","provider_key":"{PROVIDER_KEY}","lattice_rpc_prefix":"{LATTICE_PREFIX}","lattice_rpc_url":"memory://local","link_definitions":[{{"source_id":"A1","target":"{PROVIDER_KEY}"}}]}}"#
        );
        let line = format!("{}\n", STANDARD.encode(raw));

        let host = Bootstrapper::new(line.as_bytes())
            .read_host_data()
            .await
            .unwrap();
        assert_eq!(host.provider_key, PROVIDER_KEY);

        let lattice = InMemoryLattice::new();
        let runtime = ProviderRuntime::connect(
            host,
            ProviderConfig::new(CONTRACT_ID),
            ProviderHandlers::new(),
            &lattice,
        )
        .await
        .unwrap();
        assert_eq!(runtime.state(), ProviderState::Linking);

        runtime.launch().await.unwrap();
        assert_eq!(runtime.state(), ProviderState::Running);
        // persisted links are replayed before serving
        assert!(runtime.is_linked("A1", PROVIDER_KEY));
        assert_eq!(runtime.serving_peers(), vec!["A1".to_string()]);

        runtime.shutdown().await;
        assert_eq!(runtime.state(), ProviderState::Terminated);
    }

    #[tokio::test]
    async fn test_connect_refused_when_lattice_offline() {
        let lattice = InMemoryLattice::new();
        lattice.set_online(false);

        let result = ProviderRuntime::connect(
            host_data(),
            ProviderConfig::new(CONTRACT_ID),
            ProviderHandlers::new(),
            &lattice,
        )
        .await;
        assert!(matches!(
            result,
            Err(ProviderError::Bus(BusError::ConnectionRefused(_)))
        ));
    }

    #[tokio::test]
    async fn test_broker_url_not_served_in_process() {
        let mut host = host_data();
        host.lattice_rpc_url = "nats://192.0.2.1:4222".to_string();

        let result = ProviderRuntime::connect(
            host,
            ProviderConfig::new(CONTRACT_ID),
            ProviderHandlers::new(),
            &InMemoryLattice::new(),
        )
        .await;
        assert!(matches!(
            result,
            Err(ProviderError::Bus(BusError::ConnectionRefused(_)))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_broker_refuses_connect() {
        let mut host = host_data();
        host.lattice_rpc_url = "nats://127.0.0.1:1".to_string();
        let connector = lattice_connector(&host).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            ProviderRuntime::connect(
                host,
                ProviderConfig::new(CONTRACT_ID),
                ProviderHandlers::new(),
                &connector,
            ),
        )
        .await
        .unwrap();
        assert!(matches!(
            result,
            Err(ProviderError::Bus(BusError::ConnectionRefused(_)))
        ));
    }

    #[tokio::test]
    async fn test_launch_twice_is_rejected() {
        let harness = ProviderTestHarness::start(ProviderHandlers::new()).await;
        assert!(matches!(
            harness.runtime.launch().await,
            Err(ProviderError::InvalidState(ProviderState::Running))
        ));
    }

    // =========================================================================
    // LINKS
    // =========================================================================

    #[tokio::test]
    async fn test_source_link_put_runs_callback_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handlers = ProviderHandlers::new().on_source_link_put(move |link| {
            assert_eq!(link.target, "A1");
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let harness = ProviderTestHarness::start(handlers).await;

        let link = InterfaceLinkDefinition::new(PROVIDER_KEY, "A1");
        harness.put_link(&link).await;
        let runtime = harness.runtime.clone();
        assert!(eventually(|| runtime.source_links().contains_key("A1")).await);

        harness.put_link(&link).await;
        sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(harness.runtime.source_links()["A1"], link);
        // outbound links never open an invocation subscription
        assert!(harness.runtime.serving_peers().is_empty());
    }

    #[tokio::test]
    async fn test_failed_link_callback_stores_nothing() {
        let handlers =
            ProviderHandlers::new().on_target_link_put(|_| Err(anyhow::anyhow!("bad config")));
        let harness = ProviderTestHarness::start(handlers).await;

        harness
            .put_link(&InterfaceLinkDefinition::new("A1", PROVIDER_KEY))
            .await;
        sleep(Duration::from_millis(50)).await;

        assert!(harness.runtime.target_links().is_empty());
        assert!(harness.runtime.serving_peers().is_empty());
        assert_eq!(harness.runtime.state(), ProviderState::Running);
    }

    #[tokio::test]
    async fn test_link_del_tears_down_peer_subscription() {
        let harness = ProviderTestHarness::start(
            ProviderHandlers::new().on_invocation(|_| async { anyhow::Ok(b"ok".to_vec()) }),
        )
        .await;
        harness.link_actor("A1").await;

        let actor = harness.actor();
        let call = invocation("A1", PROVIDER_KEY, "Echo.Say", b"hi");
        let response = harness.invoke(&actor, &call, WAIT).await.unwrap();
        assert_eq!(response.msg, b"ok".to_vec());

        harness
            .del_link(&InterfaceLinkDefinition::new("A1", PROVIDER_KEY))
            .await;
        let runtime = harness.runtime.clone();
        assert!(eventually(|| runtime.serving_peers().is_empty()).await);
        assert!(!harness.runtime.is_linked("A1", PROVIDER_KEY));

        // no worker listens on the invocation subject any more
        let result = harness.invoke(&actor, &call, WAIT).await;
        assert!(matches!(result, Err(BusError::NoResponders(_))));
    }

    // =========================================================================
    // HEALTH
    // =========================================================================

    #[tokio::test]
    async fn test_health_check_answered() {
        let harness =
            ProviderTestHarness::start(ProviderHandlers::new().with_health_message("all good"))
                .await;
        assert_eq!(
            harness.health().await,
            HealthCheckResponse::healthy("all good")
        );
    }

    #[tokio::test]
    async fn test_unhealthy_provider_still_replies() {
        let harness = ProviderTestHarness::start(
            ProviderHandlers::new().on_health(|| HealthCheckResponse::unhealthy("disk full")),
        )
        .await;
        let health = harness.health().await;
        assert!(!health.healthy);
        assert_eq!(health.message, "disk full");
    }

    // =========================================================================
    // SHUTDOWN
    // =========================================================================

    #[tokio::test]
    async fn test_shutdown_runs_hook_and_ends_start() {
        let hooked = Arc::new(AtomicBool::new(false));
        let flag = hooked.clone();
        let harness = ProviderTestHarness::start(ProviderHandlers::new().on_shutdown(move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }))
        .await;

        let ack = harness.shutdown_via_host().await;
        assert!(ack.payload.is_empty());
        assert!(hooked.load(Ordering::SeqCst));

        let lattice = harness.lattice.clone();
        harness.finished().await.unwrap();
        // every subscription is gone, reply inboxes included
        assert_eq!(lattice.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_invocation() {
        let entered = Arc::new(AtomicBool::new(false));
        let flag = entered.clone();
        let handlers = ProviderHandlers::new().on_invocation(move |action| {
            flag.store(true, Ordering::SeqCst);
            async move {
                sleep(Duration::from_millis(200)).await;
                anyhow::Ok(action.msg)
            }
        });
        let harness = ProviderTestHarness::start(handlers).await;
        harness.link_actor("A1").await;

        let actor = harness.actor();
        let topic = harness.runtime.topics().invocations.clone();
        let payload = lattice_wire::to_vec(&invocation("A1", PROVIDER_KEY, "Slow.Op", b"late"));
        let pending = tokio::spawn(async move { actor.request(&topic, payload, WAIT).await });

        assert!(eventually(|| entered.load(Ordering::SeqCst)).await);
        harness.shutdown_via_host().await;

        let reply = pending.await.unwrap().unwrap();
        let response: lattice_types::InvocationResponse =
            lattice_wire::from_slice(&reply.payload).unwrap();
        assert_eq!(response.msg, b"late".to_vec());

        let runtime = harness.runtime.clone();
        harness.finished().await.unwrap();
        assert_eq!(runtime.state(), ProviderState::Terminated);
    }

    #[tokio::test]
    async fn test_repeated_shutdown_is_harmless() {
        let harness = ProviderTestHarness::start(ProviderHandlers::new()).await;
        harness.runtime.shutdown().await;
        harness.runtime.shutdown().await;
        assert_eq!(harness.runtime.state(), ProviderState::Terminated);
        harness.finished().await.unwrap();
    }
}
