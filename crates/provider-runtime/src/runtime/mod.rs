//! # Provider Runtime
//!
//! Lifecycle of one capability provider on the lattice.
//!
//! ```text
//! Bootstrapping ──host data + bus──► Linking ──links + subscriptions──► Running
//!                                                                          │
//!                       shutdown message / shutdown() / interrupt          │
//!                                                                          ▼
//!                         Terminated ◄──drain, flush, close── Draining ◄───┘
//! ```
//!
//! ## Subscriptions
//!
//! - four control subscriptions: health, link put, link delete, shutdown
//! - one invocation subscription per actor linked to this provider, all on
//!   the provider's invocation subject; each serves only its own actor
//!
//! Every subscription is served by a [`worker::Worker`]; handlers run
//! concurrently and the only shared mutable state is the link registry.

mod control;
mod invocations;
mod worker;

use crate::bootstrap::Bootstrapper;
use crate::config::ProviderConfig;
use crate::errors::ProviderError;
use crate::handlers::ProviderHandlers;
use crate::registry::LinkRegistry;
use lattice_bus::{BusConnector, LatticeBus, Message};
use lattice_types::{HostData, InterfaceLinkDefinition, ProviderState, Topics};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use worker::Worker;

#[derive(Default)]
struct Workers {
    control: Vec<Worker>,
    /// Invocation workers keyed by linked actor.
    peers: HashMap<String, Worker>,
}

struct RuntimeInner {
    host: HostData,
    config: ProviderConfig,
    topics: Topics,
    handlers: ProviderHandlers,
    registry: LinkRegistry,
    bus: Arc<dyn LatticeBus>,
    state: watch::Sender<ProviderState>,
    workers: Mutex<Workers>,
}

/// Handle to a running provider. Clones share the same provider.
#[derive(Clone)]
pub struct ProviderRuntime {
    inner: Arc<RuntimeInner>,
}

impl ProviderRuntime {
    // =========================================================================
    // CONSTRUCTION
    // =========================================================================

    /// Read host data from stdin and connect to the lattice it names.
    pub async fn bootstrap(
        config: ProviderConfig,
        handlers: ProviderHandlers,
        connector: &dyn BusConnector,
    ) -> Result<Self, ProviderError> {
        let host = Bootstrapper::stdin().read_host_data().await?;
        Self::connect(host, config, handlers, connector).await
    }

    /// Connect to the lattice named by `host`.
    pub async fn connect(
        host: HostData,
        config: ProviderConfig,
        handlers: ProviderHandlers,
        connector: &dyn BusConnector,
    ) -> Result<Self, ProviderError> {
        let bus = connector.connect(&host.lattice_rpc_url).await?;
        debug!(url = %host.lattice_rpc_url, "Lattice connection established");
        Ok(Self::with_bus(host, config, handlers, bus))
    }

    /// Runtime over an already established connection. Starts in `Linking`.
    pub fn with_bus(
        host: HostData,
        config: ProviderConfig,
        handlers: ProviderHandlers,
        bus: Arc<dyn LatticeBus>,
    ) -> Self {
        let topics = Topics::from_host_data(&host);
        let registry = LinkRegistry::new(host.provider_key.clone(), handlers.clone());
        let (state, _) = watch::channel(ProviderState::Bootstrapping);

        let runtime = Self {
            inner: Arc::new(RuntimeInner {
                host,
                config,
                topics,
                handlers,
                registry,
                bus,
                state,
                workers: Mutex::new(Workers::default()),
            }),
        };
        runtime.transition(ProviderState::Linking);
        runtime
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    fn transition(&self, next: ProviderState) {
        let previous = self.inner.state.send_replace(next);
        info!(from = %previous, to = %next, "Provider state changed");
    }

    /// Replay persisted links, open all subscriptions and enter `Running`.
    pub async fn launch(&self) -> Result<(), ProviderError> {
        let current = self.state();
        if current != ProviderState::Linking {
            return Err(ProviderError::InvalidState(current));
        }

        let host = &self.inner.host;
        info!(
            provider_key = %host.provider_key,
            link_name = %host.link_name(),
            lattice = %host.lattice_rpc_prefix,
            links = host.link_definitions.len(),
            "Starting capability provider"
        );

        for link in &host.link_definitions {
            self.apply_link_put(link).await;
        }

        let topics = &self.inner.topics;
        let health = self.serve("health", &topics.health, Self::handle_health).await?;
        self.inner.workers.lock().control.push(health);
        let put = self
            .serve("linkdefs.put", &topics.linkdefs_put, Self::handle_link_put)
            .await?;
        self.inner.workers.lock().control.push(put);
        let del = self
            .serve("linkdefs.del", &topics.linkdefs_del, Self::handle_link_del)
            .await?;
        self.inner.workers.lock().control.push(del);
        let shutdown = self
            .serve("shutdown", &topics.shutdown, Self::handle_shutdown)
            .await?;
        self.inner.workers.lock().control.push(shutdown);

        self.transition(ProviderState::Running);
        Ok(())
    }

    /// Launch if needed, then block until the provider has terminated.
    pub async fn start(&self) -> Result<(), ProviderError> {
        if self.state() == ProviderState::Linking {
            self.launch().await?;
        }
        self.wait_terminated().await;
        Ok(())
    }

    /// Resolve once the provider reaches `Terminated`.
    pub async fn wait_terminated(&self) {
        let mut changes = self.inner.state.subscribe();
        if changes
            .wait_for(|state| *state == ProviderState::Terminated)
            .await
            .is_err()
        {
            warn!("State channel closed before termination");
        }
    }

    /// Run the shutdown hook, then drain and terminate.
    ///
    /// Whichever of this call and a host shutdown message moves the
    /// provider into `Draining` first runs the hook and drains; later
    /// callers only wait for termination.
    pub async fn shutdown(&self) {
        if self.begin_draining() {
            self.run_shutdown_hook();
            self.finish_draining().await;
        } else {
            self.wait_terminated().await;
        }
    }

    /// Move into `Draining`. True for exactly one caller.
    pub(crate) fn begin_draining(&self) -> bool {
        let mut previous = ProviderState::Draining;
        let began = self.inner.state.send_if_modified(|state| {
            if *state < ProviderState::Draining {
                previous = *state;
                *state = ProviderState::Draining;
                true
            } else {
                false
            }
        });
        if began {
            info!(from = %previous, to = %ProviderState::Draining, "Provider state changed");
        }
        began
    }

    /// The hook's outcome never blocks termination.
    pub(crate) fn run_shutdown_hook(&self) {
        if let Err(e) = (self.inner.handlers.shutdown)() {
            warn!(error = %e, "Shutdown hook failed");
        }
    }

    /// Drain every subscription, flush what their handlers published,
    /// close the connection and terminate. Only the caller that won
    /// [`Self::begin_draining`] may run this.
    pub(crate) async fn finish_draining(&self) {
        let bus = self.inner.bus.as_ref();

        // control first, so no link change can open a peer behind our back
        let control = std::mem::take(&mut self.inner.workers.lock().control);
        for worker in control {
            worker.drain(bus).await;
        }
        let peers: Vec<Worker> = self
            .inner
            .workers
            .lock()
            .peers
            .drain()
            .map(|(_, worker)| worker)
            .collect();
        for worker in peers {
            worker.drain(bus).await;
        }

        if let Err(e) = bus.flush().await {
            warn!(error = %e, "Flush failed during drain");
        }
        if let Err(e) = bus.close().await {
            warn!(error = %e, "Close failed during drain");
        }
        self.transition(ProviderState::Terminated);
    }

    /// Subscribe to `subject` and serve it with `handler`.
    async fn serve<F, Fut>(
        &self,
        name: impl Into<String>,
        subject: &str,
        handler: F,
    ) -> Result<Worker, ProviderError>
    where
        F: Fn(ProviderRuntime, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let subscription = self.inner.bus.subscribe(subject).await?;
        let runtime = Arc::downgrade(&self.inner);
        let handler = Arc::new(handler);

        Ok(Worker::spawn(name, subscription, move |message: Message| {
            let runtime = runtime.clone();
            let handler = handler.clone();
            async move {
                if let Some(inner) = runtime.upgrade() {
                    handler(ProviderRuntime { inner }, message).await;
                }
            }
        }))
    }

    async fn reply(&self, subject: &str, payload: Vec<u8>) {
        if let Err(e) = self.inner.bus.publish(subject, payload).await {
            warn!(subject = %subject, error = %e, "Failed to publish reply");
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    #[must_use]
    pub fn state(&self) -> ProviderState {
        *self.inner.state.borrow()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ProviderState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn host_data(&self) -> &HostData {
        &self.inner.host
    }

    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn topics(&self) -> &Topics {
        &self.inner.topics
    }

    /// Links where this provider is the source, keyed by target.
    #[must_use]
    pub fn source_links(&self) -> HashMap<String, InterfaceLinkDefinition> {
        self.inner.registry.source_links()
    }

    /// Links where this provider is the target, keyed by source.
    #[must_use]
    pub fn target_links(&self) -> HashMap<String, InterfaceLinkDefinition> {
        self.inner.registry.target_links()
    }

    #[must_use]
    pub fn is_linked(&self, source: &str, target: &str) -> bool {
        self.inner.registry.is_linked(source, target)
    }

    /// Actors with an open invocation subscription.
    #[must_use]
    pub fn serving_peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.inner.workers.lock().peers.keys().cloned().collect();
        peers.sort();
        peers
    }
}
