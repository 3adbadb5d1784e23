//! # Provider Test Harness
//!
//! Starts one provider on a fresh in-process lattice and hands out
//! connections that play the host and the actors.

use lattice_bus::{BusError, InMemoryConnection, InMemoryLattice, LatticeBus, Message};
use lattice_types::{
    Entity, HealthCheckResponse, HostData, InterfaceLinkDefinition, Invocation,
    InvocationResponse, ProviderState,
};
use provider_runtime::{ProviderConfig, ProviderError, ProviderHandlers, ProviderRuntime};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

// =============================================================================
// FIXTURES
// =============================================================================

pub const PROVIDER_KEY: &str = "P1";
pub const LATTICE_PREFIX: &str = "default";
pub const CONTRACT_ID: &str = "wasmcloud:test";
pub const HOST_ID: &str = "NHOSTTEST";

/// Cluster seed the host hands out for signing invocations.
pub const INVOCATION_SEED: &str = "SCAJM3XPPWWGONF6JRV6ELRZQCXTEDZRX7RMVEWACCGXXYQP6N3SXI2IOM";
/// Public key derived from [`INVOCATION_SEED`].
pub const INVOCATION_ISSUER: &str = "CD4OQXL3T75MMPXW5DOK6JDCNBBLOOKS3RGOLRYNVOZALONYG56GDXK7";

pub const WAIT: Duration = Duration::from_secs(1);

pub fn host_data() -> HostData {
    let mut host = HostData::new(PROVIDER_KEY, LATTICE_PREFIX);
    host.host_id = HOST_ID.to_string();
    host.invocation_seed = INVOCATION_SEED.into();
    host.lattice_rpc_url = "memory://local".to_string();
    host
}

/// Inbound invocation from actor `origin` to provider `target`.
pub fn invocation(origin: &str, target: &str, operation: &str, msg: &[u8]) -> Invocation {
    Invocation::new(
        Entity::actor(origin),
        Entity::provider(target, "default", CONTRACT_ID),
        operation,
        msg.to_vec(),
        format!("call-{origin}-{operation}"),
    )
    .with_host_id(HOST_ID)
}

/// Poll `condition` until it holds or [`WAIT`] elapses.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// =============================================================================
// HARNESS
// =============================================================================

pub struct ProviderTestHarness {
    pub lattice: InMemoryLattice,
    pub runtime: ProviderRuntime,
    pub config: ProviderConfig,
    /// Connection playing the lattice host.
    pub host: InMemoryConnection,
    started: JoinHandle<Result<(), ProviderError>>,
}

impl ProviderTestHarness {
    /// Provider `P1` with default host data and `handlers`.
    pub async fn start(handlers: ProviderHandlers) -> Self {
        Self::start_with(host_data(), ProviderConfig::new(CONTRACT_ID), handlers).await
    }

    /// Connect, spawn the blocking `start` call and wait for `Running`.
    pub async fn start_with(
        host: HostData,
        config: ProviderConfig,
        handlers: ProviderHandlers,
    ) -> Self {
        let lattice = InMemoryLattice::new();
        let runtime = ProviderRuntime::connect(host, config.clone(), handlers, &lattice)
            .await
            .expect("provider should connect");

        let blocking = runtime.clone();
        let started = tokio::spawn(async move { blocking.start().await });

        let mut changes = runtime.state_changes();
        let running = timeout(WAIT, changes.wait_for(|s| *s >= ProviderState::Running))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false);
        assert!(running, "provider did not reach Running");

        let host = lattice.connection();
        Self {
            lattice,
            runtime,
            config,
            host,
            started,
        }
    }

    /// A fresh connection for an actor.
    pub fn actor(&self) -> InMemoryConnection {
        self.lattice.connection()
    }

    /// Publish a link definition as the host does.
    pub async fn put_link(&self, link: &InterfaceLinkDefinition) {
        let payload = self.config.encode_link(link).unwrap();
        self.host
            .publish(&self.runtime.topics().linkdefs_put, payload)
            .await
            .unwrap();
    }

    pub async fn del_link(&self, link: &InterfaceLinkDefinition) {
        let payload = self.config.encode_link(link).unwrap();
        self.host
            .publish(&self.runtime.topics().linkdefs_del, payload)
            .await
            .unwrap();
    }

    /// Put `actor -> P1` and wait until the provider serves that actor.
    pub async fn link_actor(&self, actor: &str) {
        self.put_link(&InterfaceLinkDefinition::new(actor, PROVIDER_KEY))
            .await;
        let runtime = self.runtime.clone();
        let actor = actor.to_string();
        assert!(
            eventually(|| runtime.serving_peers().contains(&actor)).await,
            "provider never subscribed for the actor"
        );
    }

    pub async fn health(&self) -> HealthCheckResponse {
        let reply = self
            .host
            .request(&self.runtime.topics().health, Vec::new(), WAIT)
            .await
            .expect("health check should be answered");
        self.config.decode_health(&reply.payload).unwrap()
    }

    /// Send `invocation` from `actor` and decode the reply.
    pub async fn invoke(
        &self,
        actor: &InMemoryConnection,
        invocation: &Invocation,
        wait: Duration,
    ) -> Result<InvocationResponse, BusError> {
        let payload = lattice_wire::to_vec_with(invocation, self.config.entity_tagging);
        let reply = actor
            .request(&self.runtime.topics().invocations, payload, wait)
            .await?;
        Ok(lattice_wire::from_slice_with(&reply.payload, self.config.entity_tagging).unwrap())
    }

    /// Ask the provider to stop, as the host does.
    pub async fn shutdown_via_host(&self) -> Message {
        self.host
            .request(&self.runtime.topics().shutdown, Vec::new(), WAIT)
            .await
            .expect("shutdown should be acknowledged")
    }

    /// Outcome of the blocking `start` call.
    pub async fn finished(self) -> Result<(), ProviderError> {
        timeout(WAIT, self.started)
            .await
            .expect("start did not return")
            .expect("start task panicked")
    }
}
